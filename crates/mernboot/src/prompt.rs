//! Line-based terminal prompts

use std::io::{self, BufRead, Write};

/// Reads answers line by line from any buffered reader (stdin in the binary)
pub struct Prompter<R> {
    input: R,
}

impl Prompter<io::StdinLock<'static>> {
    pub fn stdin() -> Self {
        Self::new(io::stdin().lock())
    }
}

impl<R: BufRead> Prompter<R> {
    pub fn new(input: R) -> Self {
        Self { input }
    }

    /// Ask a question and return the trimmed answer (may be empty)
    pub fn ask(&mut self, question: &str) -> io::Result<String> {
        print!("{}", question);
        io::stdout().flush()?;

        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "input closed"));
        }
        Ok(line.trim().to_string())
    }

    /// Ask until a non-empty answer is given
    pub fn ask_required(&mut self, question: &str) -> io::Result<String> {
        loop {
            let answer = self.ask(question)?;
            if !answer.is_empty() {
                return Ok(answer);
            }
            println!("A value is required.");
        }
    }

    /// Ask with a default used for an empty answer
    pub fn ask_or(&mut self, question: &str, default: &str) -> io::Result<String> {
        let answer = self.ask(question)?;
        Ok(if answer.is_empty() {
            default.to_string()
        } else {
            answer
        })
    }

    /// Ask for a menu choice between 1 and `max`
    pub fn choose(&mut self, question: &str, max: usize) -> io::Result<usize> {
        loop {
            let answer = self.ask(question)?;
            match answer.parse::<usize>() {
                Ok(choice) if (1..=max).contains(&choice) => return Ok(choice),
                _ => println!("Invalid option. Please choose 1-{}.", max),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_ask_trims() {
        let mut prompt = Prompter::new(Cursor::new("  demo  \n"));
        assert_eq!(prompt.ask("name: ").unwrap(), "demo");
    }

    #[test]
    fn test_ask_or_default() {
        let mut prompt = Prompter::new(Cursor::new("\ncustom\n"));
        assert_eq!(prompt.ask_or("cluster: ", "myCluster").unwrap(), "myCluster");
        assert_eq!(prompt.ask_or("cluster: ", "myCluster").unwrap(), "custom");
    }

    #[test]
    fn test_ask_required_repeats() {
        let mut prompt = Prompter::new(Cursor::new("\n\nalice\n"));
        assert_eq!(prompt.ask_required("user: ").unwrap(), "alice");
    }

    #[test]
    fn test_choose_rejects_out_of_range() {
        let mut prompt = Prompter::new(Cursor::new("0\nx\n5\n3\n"));
        assert_eq!(prompt.choose("option: ", 4).unwrap(), 3);
    }

    #[test]
    fn test_eof_is_error() {
        let mut prompt = Prompter::new(Cursor::new(""));
        let err = prompt.ask("name: ").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }
}
