//! Standard streams
//!
//! The dispatcher and the host write through [`Streams`] so that tests can
//! capture output and the launcher can switch to unbuffered mode.

use std::io::{self, BufRead, BufReader, BufWriter, Read, Write};

/// Line source for the interactive loop, e.g. a line editor.
pub trait Console {
    /// Read one line without its terminator. `Ok(None)` at end of input.
    fn read_line(&mut self, prompt: &str) -> io::Result<Option<String>>;
}

/// Standard input, output and error.
pub struct Streams {
    pub stdin: Box<dyn BufRead>,
    pub stdout: Box<dyn Write>,
    pub stderr: Box<dyn Write>,
    console: Option<Box<dyn Console>>,
    unbuffered: bool,
}

impl Streams {
    pub fn new(stdin: Box<dyn BufRead>, stdout: Box<dyn Write>, stderr: Box<dyn Write>) -> Self {
        Self {
            stdin,
            stdout,
            stderr,
            console: None,
            unbuffered: false,
        }
    }

    /// The process streams. Standard output is block buffered until
    /// [`Streams::set_unbuffered`] is called.
    pub fn stdio() -> Self {
        Self::new(
            Box::new(BufReader::new(io::stdin())),
            Box::new(BufWriter::new(io::stdout())),
            Box::new(io::stderr()),
        )
    }

    /// Read interactive lines from `console` instead of standard input.
    pub fn with_console(mut self, console: Box<dyn Console>) -> Self {
        self.console = Some(console);
        self
    }

    /// Flush standard output and error after every write.
    pub fn set_unbuffered(&mut self) {
        if self.unbuffered {
            return;
        }
        let stdout = std::mem::replace(&mut self.stdout, Box::new(io::sink()));
        let stderr = std::mem::replace(&mut self.stderr, Box::new(io::sink()));
        self.stdout = Box::new(WriteThrough(stdout));
        self.stderr = Box::new(WriteThrough(stderr));
        self.unbuffered = true;
    }

    pub fn is_unbuffered(&self) -> bool {
        self.unbuffered
    }

    /// Prompt for and read one interactive line.
    pub fn read_line(&mut self, prompt: &str) -> io::Result<Option<String>> {
        self.stdout.flush()?;
        if let Some(console) = self.console.as_mut() {
            return console.read_line(prompt);
        }
        self.stderr.write_all(prompt.as_bytes())?;
        self.stderr.flush()?;

        let mut line = String::new();
        if self.stdin.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        while line.ends_with('\n') || line.ends_with('\r') {
            line.pop();
        }
        Ok(Some(line))
    }

    /// Read all of standard input.
    pub fn read_stdin(&mut self) -> io::Result<Vec<u8>> {
        let mut bytes = Vec::new();
        self.stdin.read_to_end(&mut bytes)?;
        Ok(bytes)
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.stdout.flush()?;
        self.stderr.flush()
    }
}

struct WriteThrough(Box<dyn Write>);

impl Write for WriteThrough {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.0.write(buf)?;
        self.0.flush()?;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.0.flush()
    }
}


#[cfg(test)]
mod tests {
    use super::testing::captured;
    use super::*;

    struct Scripted(Vec<&'static str>);

    impl Console for Scripted {
        fn read_line(&mut self, _prompt: &str) -> io::Result<Option<String>> {
            if self.0.is_empty() {
                Ok(None)
            } else {
                Ok(Some(self.0.remove(0).to_string()))
            }
        }
    }

    #[test]
    fn test_read_line_prompts_on_stderr() {
        let (mut streams, out, err) = captured("first\r\nsecond");
        assert_eq!(streams.read_line(">>> ").unwrap().as_deref(), Some("first"));
        assert_eq!(streams.read_line(">>> ").unwrap().as_deref(), Some("second"));
        assert_eq!(streams.read_line(">>> ").unwrap(), None);
        assert_eq!(err.text(), ">>> >>> >>> ");
        assert!(out.text().is_empty());
    }

    #[test]
    fn test_console_replaces_stdin() {
        let (streams, _, err) = captured("ignored\n");
        let mut streams = streams.with_console(Box::new(Scripted(vec!["1 + 1"])));
        assert_eq!(streams.read_line(">>> ").unwrap().as_deref(), Some("1 + 1"));
        assert_eq!(streams.read_line(">>> ").unwrap(), None);
        assert!(err.text().is_empty());
    }

    #[test]
    fn test_unbuffered_passes_writes_through() {
        let (mut streams, out, _) = captured("");
        streams.set_unbuffered();
        streams.set_unbuffered();
        assert!(streams.is_unbuffered());
        streams.stdout.write_all(b"now").unwrap();
        assert_eq!(out.text(), "now");
    }

    #[test]
    fn test_read_stdin() {
        let (mut streams, _, _) = captured("print(1)\n");
        assert_eq!(streams.read_stdin().unwrap(), b"print(1)\n");
    }
}
