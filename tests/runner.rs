use std::time::Duration;

use gauge_lsp::RunnerConnection;
use gauge_lsp::runner::{RunnerError, RunnerMessage, Span, StepNameResponse, StreamRunner};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, DuplexStream, ReadHalf, WriteHalf};

const TIMEOUT: Duration = Duration::from_secs(5);

type TestRunner = StreamRunner<WriteHalf<DuplexStream>>;

/// The runner side of an in-memory connection.
struct RunnerSide {
    lines: tokio::io::Lines<BufReader<ReadHalf<DuplexStream>>>,
    writer: WriteHalf<DuplexStream>,
}

impl RunnerSide {
    async fn next_request(&mut self) -> RunnerMessage {
        let line = self
            .lines
            .next_line()
            .await
            .expect("read failed")
            .expect("connection closed");
        serde_json::from_str(&line).expect("invalid request")
    }

    async fn send_raw(&mut self, line: &str) {
        self.writer.write_all(line.as_bytes()).await.unwrap();
        self.writer.write_all(b"\n").await.unwrap();
        self.writer.flush().await.unwrap();
    }

    async fn reply(&mut self, message_id: u64, response: StepNameResponse) {
        let reply = RunnerMessage::StepNameResponse {
            message_id,
            response,
        };
        self.send_raw(&serde_json::to_string(&reply).unwrap()).await;
    }
}

fn connect() -> (TestRunner, RunnerSide) {
    let (client, server) = tokio::io::duplex(4096);
    let (client_read, client_write) = tokio::io::split(client);
    let (server_read, server_write) = tokio::io::split(server);
    let runner = StreamRunner::new(client_read, client_write);
    let side = RunnerSide {
        lines: BufReader::new(server_read).lines(),
        writer: server_write,
    };
    (runner, side)
}

fn present(file_name: &str, start: u32, end: u32) -> StepNameResponse {
    StepNameResponse {
        is_step_present: true,
        file_name: file_name.to_string(),
        span: Span {
            start,
            start_char: 4,
            end,
            end_char: 5,
        },
    }
}

fn step_value(message: &RunnerMessage) -> &str {
    match message {
        RunnerMessage::StepNameRequest { step_value, .. } => step_value,
        other => panic!("Expected StepNameRequest, got: {:?}", other),
    }
}

#[tokio::test]
async fn test_request_receives_matching_response() {
    let (runner, mut side) = connect();

    let server = tokio::spawn(async move {
        let request = side.next_request().await;
        assert_eq!(step_value(&request), "Say {} to {}");
        side.reply(request.message_id(), present("/src/Steps.java", 12, 15))
            .await;
        side
    });

    let reply = runner
        .request(RunnerMessage::step_name_request("Say {} to {}"), TIMEOUT)
        .await
        .unwrap();
    let response = reply.step_name_response().unwrap();
    assert!(response.is_step_present);
    assert_eq!(response.file_name, "/src/Steps.java");
    assert_eq!(response.span.start, 12);

    server.await.unwrap();
}

#[tokio::test]
async fn test_concurrent_requests_are_routed_by_id() {
    let (runner, mut side) = connect();

    let server = tokio::spawn(async move {
        let first = side.next_request().await;
        let second = side.next_request().await;
        // Answer in reverse order.
        for request in [&second, &first] {
            let line = if step_value(request) == "First step" { 1 } else { 2 };
            side.reply(request.message_id(), present("/src/Steps.java", line, line))
                .await;
        }
        side
    });

    let (first, second) = tokio::join!(
        runner.request(RunnerMessage::step_name_request("First step"), TIMEOUT),
        runner.request(RunnerMessage::step_name_request("Second step"), TIMEOUT),
    );

    assert_eq!(first.unwrap().step_name_response().unwrap().span.start, 1);
    assert_eq!(second.unwrap().step_name_response().unwrap().span.start, 2);
    server.await.unwrap();
}

#[tokio::test]
async fn test_unanswered_request_times_out() {
    let (runner, mut side) = connect();

    let err = runner
        .request(
            RunnerMessage::step_name_request("Slow step"),
            Duration::from_millis(50),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, RunnerError::Timeout(_)), "got {err:?}");

    // A late reply is dropped and the connection keeps working.
    let late = side.next_request().await;
    side.reply(late.message_id(), present("/src/Steps.java", 9, 9))
        .await;

    let server = tokio::spawn(async move {
        let request = side.next_request().await;
        side.reply(request.message_id(), present("/src/Steps.java", 3, 3))
            .await;
        side
    });
    let reply = runner
        .request(RunnerMessage::step_name_request("Fast step"), TIMEOUT)
        .await
        .unwrap();
    assert_eq!(reply.step_name_response().unwrap().span.start, 3);
    server.await.unwrap();
}

#[tokio::test]
async fn test_closed_connection_fails_pending_request() {
    let (runner, mut side) = connect();

    let server = tokio::spawn(async move {
        side.next_request().await;
        drop(side);
    });

    let err = runner
        .request(RunnerMessage::step_name_request("Any step"), TIMEOUT)
        .await
        .unwrap_err();
    assert!(matches!(err, RunnerError::Disconnected), "got {err:?}");
    server.await.unwrap();
}

#[tokio::test]
async fn test_garbage_lines_are_ignored() {
    let (runner, mut side) = connect();

    let server = tokio::spawn(async move {
        let request = side.next_request().await;
        side.send_raw("this is not json").await;
        side.send_raw("").await;
        side.reply(request.message_id(), StepNameResponse::default())
            .await;
        side
    });

    let reply = runner
        .request(RunnerMessage::step_name_request("Unknown step"), TIMEOUT)
        .await
        .unwrap();
    assert!(!reply.step_name_response().unwrap().is_step_present);
    server.await.unwrap();
}

#[tokio::test]
async fn test_dropped_peer_marks_runner_disconnected() {
    let (runner, side) = connect();
    assert!(runner.is_connected());
    drop(side);

    for _ in 0..200 {
        if !runner.is_connected() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    assert!(!runner.is_connected());

    // Refused up front rather than waiting out the timeout.
    let err = runner
        .request(RunnerMessage::step_name_request("Any step"), TIMEOUT)
        .await
        .unwrap_err();
    assert!(matches!(err, RunnerError::Disconnected), "got {err:?}");
}
