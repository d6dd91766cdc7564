// Input handling for the lexis-repl binary
// Resolves where a program comes from: a string, a file, stdin, or the prompt

use clap::ValueEnum;
use std::fs;
use std::io::{self, BufRead};
use std::path::PathBuf;
use thiserror::Error;

/// Input source types supported by lexis-repl
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum InputSource {
    /// Interactive prompt
    Interactive,
    /// Evaluate a string directly
    String,
    /// Evaluate a file
    File,
    /// Read from stdin pipe
    Pipe,
}

#[derive(Debug, Clone)]
pub struct InputConfig {
    pub source: InputSource,
    pub file_path: Option<PathBuf>,
    pub string_content: Option<String>,
}

impl InputConfig {
    pub fn from_file(file_path: PathBuf) -> Self {
        Self {
            source: InputSource::File,
            file_path: Some(file_path),
            string_content: None,
        }
    }

    pub fn from_string(content: String) -> Self {
        Self {
            source: InputSource::String,
            file_path: None,
            string_content: Some(content),
        }
    }

    pub fn from_pipe() -> Self {
        Self {
            source: InputSource::Pipe,
            file_path: None,
            string_content: None,
        }
    }

    pub fn interactive() -> Self {
        Self {
            source: InputSource::Interactive,
            file_path: None,
            string_content: None,
        }
    }
}

/// Program text and a name for diagnostics
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputContent {
    pub content: String,
    pub source_name: String,
}

/// Read the program text named by `config`. Interactive input is driven by
/// the prompt loop and is refused here.
pub fn read_input_content(config: &InputConfig) -> Result<InputContent, InputError> {
    match config.source {
        InputSource::File => {
            let file_path = config
                .file_path
                .as_ref()
                .ok_or(InputError::MissingFileArgument)?;
            let content = fs::read_to_string(file_path).map_err(|error| InputError::FileRead {
                path: file_path.clone(),
                error,
            })?;
            log::debug!("read {} bytes from {}", content.len(), file_path.display());
            Ok(InputContent {
                content,
                source_name: file_path.to_string_lossy().to_string(),
            })
        }
        InputSource::String => {
            let content = config
                .string_content
                .clone()
                .ok_or(InputError::MissingStringArgument)?;
            log::debug!("evaluating string input ({} bytes)", content.len());
            Ok(InputContent {
                content,
                source_name: "<string>".to_string(),
            })
        }
        InputSource::Pipe => read_pipe(io::stdin().lock()),
        InputSource::Interactive => Err(InputError::InteractiveNotSupported),
    }
}

/// Read piped program text line by line.
pub fn read_pipe<R: BufRead>(reader: R) -> Result<InputContent, InputError> {
    let mut content = String::new();
    for line in reader.lines() {
        content.push_str(&line.map_err(InputError::StdinRead)?);
        content.push('\n');
    }
    log::debug!("read {} bytes from stdin", content.len());
    Ok(InputContent {
        content,
        source_name: "<stdin>".to_string(),
    })
}

/// Check that the arguments required by `source` are present.
pub fn validate_input_args(
    source: InputSource,
    file_path: &Option<PathBuf>,
    string_content: &Option<String>,
) -> Result<(), InputError> {
    match source {
        InputSource::File if file_path.is_none() => Err(InputError::MissingFileArgument),
        InputSource::String if string_content.is_none() => Err(InputError::MissingStringArgument),
        _ => Ok(()),
    }
}

#[derive(Debug, Error)]
pub enum InputError {
    #[error("--file argument required when using --input file")]
    MissingFileArgument,

    #[error("--string argument required when using --input string")]
    MissingStringArgument,

    #[error("error reading file '{}': {error}", .path.display())]
    FileRead {
        path: PathBuf,
        #[source]
        error: std::io::Error,
    },

    #[error("error reading from stdin: {0}")]
    StdinRead(#[source] std::io::Error),

    #[error("interactive input is handled by the prompt loop")]
    InteractiveNotSupported,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_input_config_from_file() {
        let config = InputConfig::from_file(PathBuf::from("test.lx"));
        assert_eq!(config.source, InputSource::File);
        assert_eq!(config.file_path, Some(PathBuf::from("test.lx")));
        assert_eq!(config.string_content, None);
    }

    #[test]
    fn test_input_config_from_string() {
        let config = InputConfig::from_string("(+ 1 2)".to_string());
        assert_eq!(config.source, InputSource::String);
        assert_eq!(config.file_path, None);
        assert_eq!(config.string_content, Some("(+ 1 2)".to_string()));
    }

    #[test]
    fn test_validate_input_args() {
        assert!(
            validate_input_args(InputSource::File, &Some(PathBuf::from("test.lx")), &None).is_ok()
        );
        assert!(matches!(
            validate_input_args(InputSource::File, &None, &None),
            Err(InputError::MissingFileArgument)
        ));
        assert!(
            validate_input_args(InputSource::String, &None, &Some("(+ 1 2)".to_string())).is_ok()
        );
        assert!(validate_input_args(InputSource::String, &None, &None).is_err());
        assert!(validate_input_args(InputSource::Pipe, &None, &None).is_ok());
    }

    #[test]
    fn test_read_file_and_pipe() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "(list 1 2)").unwrap();
        let input = read_input_content(&InputConfig::from_file(file.path().to_path_buf())).unwrap();
        assert_eq!(input.content, "(list 1 2)");

        let piped = read_pipe("(+ 1\n 2)".as_bytes()).unwrap();
        assert_eq!(piped.content, "(+ 1\n 2)\n");
        assert_eq!(piped.source_name, "<stdin>");

        assert!(matches!(
            read_input_content(&InputConfig::interactive()),
            Err(InputError::InteractiveNotSupported)
        ));
    }
}
