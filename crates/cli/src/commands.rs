use std::path::PathBuf;

use catalog::GenreFilter;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    List,
    Search(String),
    Genre(GenreFilter),
    Genres,
    Page(usize),
    Next,
    Prev,
    Select(String),
    SelectPage,
    Clear,
    Delete(String),
    DeleteSelected,
    Create,
    Edit(String),
    Attach { id: String, path: PathBuf },
    Upload(String),
    RemoveFile(String),
    Play(String),
    Pause(String),
    Reload,
    Help,
    Quit,
}

#[derive(Debug, PartialEq, Eq)]
pub enum CommandError {
    Empty,
    Unknown(String),
    MissingArgument {
        command: &'static str,
        argument: &'static str,
    },
    InvalidPage(String),
}

impl std::fmt::Display for CommandError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CommandError::Empty => write!(f, "empty command"),
            CommandError::Unknown(name) => write!(f, "unknown command '{}'; try 'help'", name),
            CommandError::MissingArgument { command, argument } => {
                write!(f, "usage: {} <{}>", command, argument)
            }
            CommandError::InvalidPage(value) => write!(f, "invalid page number '{}'", value),
        }
    }
}

impl std::error::Error for CommandError {}

pub const HELP: &str = "\
commands:
  list                      show the current page
  search [text]             filter by title, artist or album (empty clears)
  genre <name|all>          filter by genre
  genres                    list the genre vocabulary
  page <n> | next | prev    change page
  select <id>               toggle one track in the selection
  select-page               toggle every track on this page
  clear                     clear the selection
  delete <id>               delete one track
  delete-selected           delete every selected track
  create | edit <id>        open the track form
  attach <id> <path>        choose an mp3/wav file for a track
  upload <id>               upload the chosen file
  remove-file <id>          remove a track's audio file
  play <id> | pause <id>    audio playback
  reload                    fetch tracks and genres again
  quit";

impl Command {
    pub fn parse(line: &str) -> Result<Self, CommandError> {
        let line = line.trim();
        let (name, rest) = match line.split_once(char::is_whitespace) {
            Some((name, rest)) => (name, rest.trim()),
            None => (line, ""),
        };
        if name.is_empty() {
            return Err(CommandError::Empty);
        }

        let command = match name.to_ascii_lowercase().as_str() {
            "list" | "ls" => Command::List,
            "search" | "find" => Command::Search(rest.to_string()),
            "genre" => Command::Genre(GenreFilter::parse(required(rest, "genre", "name|all")?)),
            "genres" => Command::Genres,
            "page" => {
                let value = required(rest, "page", "n")?;
                let page = value
                    .parse::<usize>()
                    .map_err(|_| CommandError::InvalidPage(value.to_string()))?;
                Command::Page(page)
            }
            "next" | "n" => Command::Next,
            "prev" | "p" => Command::Prev,
            "select" => Command::Select(required(rest, "select", "id")?.to_string()),
            "select-page" => Command::SelectPage,
            "clear" => Command::Clear,
            "delete" | "rm" => Command::Delete(required(rest, "delete", "id")?.to_string()),
            "delete-selected" => Command::DeleteSelected,
            "create" | "new" => Command::Create,
            "edit" => Command::Edit(required(rest, "edit", "id")?.to_string()),
            "attach" => {
                let (id, path) = match rest.split_once(char::is_whitespace) {
                    Some((id, path)) if !path.trim().is_empty() => (id, path.trim()),
                    _ => {
                        return Err(CommandError::MissingArgument {
                            command: "attach",
                            argument: "id> <path",
                        })
                    }
                };
                Command::Attach {
                    id: id.to_string(),
                    path: PathBuf::from(path),
                }
            }
            "upload" => Command::Upload(required(rest, "upload", "id")?.to_string()),
            "remove-file" => Command::RemoveFile(required(rest, "remove-file", "id")?.to_string()),
            "play" => Command::Play(required(rest, "play", "id")?.to_string()),
            "pause" => Command::Pause(required(rest, "pause", "id")?.to_string()),
            "reload" => Command::Reload,
            "help" | "?" => Command::Help,
            "quit" | "exit" | "q" => Command::Quit,
            other => return Err(CommandError::Unknown(other.to_string())),
        };
        Ok(command)
    }
}

fn required<'a>(
    value: &'a str,
    command: &'static str,
    argument: &'static str,
) -> Result<&'a str, CommandError> {
    if value.is_empty() {
        Err(CommandError::MissingArgument { command, argument })
    } else {
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_simple_commands() {
        assert_eq!(Command::parse("list"), Ok(Command::List));
        assert_eq!(Command::parse("  NEXT "), Ok(Command::Next));
        assert_eq!(Command::parse("select-page"), Ok(Command::SelectPage));
        assert_eq!(Command::parse("q"), Ok(Command::Quit));
    }

    #[test]
    fn search_keeps_inner_whitespace_and_allows_empty() {
        assert_eq!(
            Command::parse("search  karma police "),
            Ok(Command::Search("karma police".to_string()))
        );
        assert_eq!(Command::parse("search"), Ok(Command::Search(String::new())));
    }

    #[test]
    fn genre_all_clears_the_filter() {
        assert_eq!(Command::parse("genre all"), Ok(Command::Genre(GenreFilter::All)));
        assert_eq!(
            Command::parse("genre Hip Hop"),
            Ok(Command::Genre(GenreFilter::Only("Hip Hop".to_string())))
        );
        assert_eq!(
            Command::parse("genre All"),
            Ok(Command::Genre(GenreFilter::Only("All".to_string())))
        );
    }

    #[test]
    fn page_requires_a_number() {
        assert_eq!(Command::parse("page 3"), Ok(Command::Page(3)));
        assert_eq!(
            Command::parse("page three"),
            Err(CommandError::InvalidPage("three".to_string()))
        );
        assert!(matches!(
            Command::parse("page"),
            Err(CommandError::MissingArgument { command: "page", .. })
        ));
    }

    #[test]
    fn attach_takes_id_and_path_with_spaces() {
        assert_eq!(
            Command::parse("attach abc /music/My Song.mp3"),
            Ok(Command::Attach {
                id: "abc".to_string(),
                path: PathBuf::from("/music/My Song.mp3"),
            })
        );
        assert!(Command::parse("attach abc").is_err());
    }

    #[test]
    fn rejects_unknown_and_empty_input() {
        assert_eq!(Command::parse("   "), Err(CommandError::Empty));
        assert_eq!(
            Command::parse("dance"),
            Err(CommandError::Unknown("dance".to_string()))
        );
    }
}
