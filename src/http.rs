use std::thread;
use std::time::Duration;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(3);
const READ_TIMEOUT: Duration = Duration::from_secs(8);

fn is_retryable_status(status: u16) -> bool {
    status == 408 || status == 429 || (500..=599).contains(&status)
}

/// Fetch a feed document over HTTP(S) with a bounded retry budget.
/// Only transient statuses and transport errors are retried.
pub(crate) fn fetch_text(url: &str, attempts: usize, retry_delay: Duration) -> Result<String, String> {
    let attempts = attempts.max(1);

    for attempt in 1..=attempts {
        let agent = ureq::AgentBuilder::new()
            .timeout_connect(CONNECT_TIMEOUT)
            .timeout_read(READ_TIMEOUT)
            .timeout_write(READ_TIMEOUT)
            .build();

        match agent.get(url).call() {
            Ok(response) => match response.into_string() {
                Ok(body) => return Ok(body),
                Err(err) => return Err(format!("feed fetch failed: body decode failed: {err}")),
            },
            Err(ureq::Error::Status(status, _)) => {
                if is_retryable_status(status) && attempt < attempts {
                    thread::sleep(retry_delay);
                    continue;
                }
                if is_retryable_status(status) {
                    return Err(format!(
                        "feed fetch failed after {attempts} attempt(s): HTTP status {status}"
                    ));
                }
                return Err(format!("feed fetch failed: HTTP status {status}"));
            }
            Err(ureq::Error::Transport(err)) => {
                if attempt < attempts {
                    thread::sleep(retry_delay);
                    continue;
                }
                return Err(format!(
                    "feed fetch failed after {attempts} attempt(s): transport error: {err}"
                ));
            }
        }
    }

    Err("feed fetch failed: exhausted attempts without a concrete error".to_string())
}

#[cfg(test)]
mod tests {
    use std::io::{Read, Write};
    use std::net::TcpListener;

    use super::*;

    /// One-shot HTTP server: answers each queued status/body pair in order,
    /// then stops accepting.
    fn spawn_server(responses: Vec<(u16, &'static str)>) -> String {
        let listener = TcpListener::bind(("127.0.0.1", 0)).expect("bind test server");
        let addr = listener.local_addr().expect("local addr");

        std::thread::spawn(move || {
            for (status, body) in responses {
                let Ok((mut stream, _)) = listener.accept() else {
                    return;
                };
                let mut buf = [0_u8; 1024];
                let _ = stream.read(&mut buf);
                let _ = write!(
                    stream,
                    "HTTP/1.1 {status} X\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                    body.len()
                );
                let _ = stream.flush();
            }
        });

        format!("http://{addr}")
    }

    #[test]
    fn retries_transient_status_then_succeeds() {
        let url = spawn_server(vec![(500, "down"), (429, "slow"), (200, "feed-body")]);

        let body = fetch_text(&url, 3, Duration::from_millis(1)).expect("third attempt succeeds");
        assert_eq!(body, "feed-body");
    }

    #[test]
    fn does_not_retry_hard_client_errors() {
        let url = spawn_server(vec![(404, "missing"), (200, "never-reached")]);

        let err = fetch_text(&url, 5, Duration::from_millis(1)).expect_err("404 is terminal");
        assert!(err.contains("HTTP status 404"), "unexpected error: {err}");
    }

    #[test]
    fn reports_exhausted_attempts_for_persistent_failures() {
        let url = spawn_server(vec![(503, "down"), (503, "still down")]);

        let err = fetch_text(&url, 2, Duration::from_millis(1)).expect_err("budget exhausted");
        assert!(
            err.contains("after 2 attempt(s)") && err.contains("503"),
            "unexpected error: {err}"
        );
    }
}
