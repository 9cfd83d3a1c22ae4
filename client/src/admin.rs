//! Console for the server's line-based admin port.

use log::info;
use std::io;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;

pub struct AdminConsole {
    lines: Lines<BufReader<OwnedReadHalf>>,
    writer: OwnedWriteHalf,
    welcome: String,
}

impl AdminConsole {
    /// Connects and reads the welcome banner.
    pub async fn connect(addr: &str) -> io::Result<Self> {
        let stream = TcpStream::connect(addr).await?;
        let (reader, writer) = stream.into_split();
        let mut lines = BufReader::new(reader).lines();

        let welcome = lines
            .next_line()
            .await?
            .ok_or_else(|| io::Error::new(io::ErrorKind::UnexpectedEof, "no welcome banner"))?;
        info!("Connected to admin port {}", addr);

        Ok(Self {
            lines,
            writer,
            welcome,
        })
    }

    pub fn welcome(&self) -> &str {
        &self.welcome
    }

    /// Sends one command and returns its single response line.
    pub async fn command(&mut self, line: &str) -> io::Result<String> {
        self.writer.write_all(line.trim().as_bytes()).await?;
        self.writer.write_all(b"\n").await?;
        self.writer.flush().await?;

        self.lines
            .next_line()
            .await?
            .ok_or_else(|| io::Error::new(io::ErrorKind::UnexpectedEof, "server closed the admin connection"))
    }

    /// Forwards every non-empty line of `input` and prints the response.
    /// Stops at end of input or after `SHUTDOWN`.
    pub async fn run<I>(mut self, input: I) -> io::Result<()>
    where
        I: AsyncBufRead + Unpin,
    {
        println!("{}", self.welcome);
        let mut input = input.lines();

        while let Some(line) = input.next_line().await? {
            if line.trim().is_empty() {
                continue;
            }
            let response = self.command(&line).await?;
            println!("{}", response);

            if line.trim().eq_ignore_ascii_case("shutdown") {
                break;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    /// Answers every line with `ok: <line>` after a banner.
    async fn echo_server() -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let (reader, mut writer) = stream.into_split();
            writer.write_all(b"banner\n").await.unwrap();
            let mut lines = BufReader::new(reader).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                writer.write_all(format!("ok: {}\n", line).as_bytes()).await.unwrap();
            }
        });
        addr
    }

    #[tokio::test]
    async fn test_console_reads_banner_and_replies() {
        let addr = echo_server().await;
        let mut console = AdminConsole::connect(&addr).await.unwrap();

        assert_eq!(console.welcome(), "banner");
        assert_eq!(console.command("  LIST_PLAYERS ").await.unwrap(), "ok: LIST_PLAYERS");
        assert_eq!(console.command("start_game").await.unwrap(), "ok: start_game");
    }

    #[tokio::test]
    async fn test_console_run_stops_after_shutdown() {
        let addr = echo_server().await;
        let console = AdminConsole::connect(&addr).await.unwrap();
        let input: &[u8] = b"LIST_PLAYERS\n\nshutdown\nSTART_GAME\n";

        console.run(BufReader::new(input)).await.unwrap();
    }
}
