extern crate reqwest;
extern crate serde_json;
extern crate serde_xml_rs;
extern crate std;

pub type GoRoundResult<T> = std::result::Result<T, GoRoundError>;

// The Display text of each variant is what ends up in the chat message.
#[derive(Debug)]
pub enum GoRoundError {
    FormParseError(String),
    FetchError(reqwest::Error),
    ReadError(std::io::Error),
    ParseError(String),
    EncodeError(serde_json::Error),
    Other(String),
}

pub fn make_error(msg: &str) -> GoRoundError {
    return GoRoundError::Other(msg.to_string());
}

impl std::fmt::Display for GoRoundError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match *self {
            GoRoundError::FormParseError(ref msg) => {
                return write!(f, "Error: Error parsing form data: {}", msg);
            },
            GoRoundError::FetchError(ref err) => {
                return write!(f, "Error: Couldn't fetch predictions from nextbus: {}", err);
            },
            GoRoundError::ReadError(ref err) => {
                return write!(f, "Error: Couldn't read response from nextbus: {}", err);
            },
            GoRoundError::ParseError(ref msg) => {
                return write!(f, "Error: Couldn't unmarshal XML from nextbus: {}", msg);
            },
            GoRoundError::EncodeError(ref err) => {
                return write!(f, "Error: Couldn't marshal the response... weird.  {}", err);
            },
            GoRoundError::Other(ref msg) => {
                return write!(f, "Error: {}", msg);
            },
        }
    }
}

impl std::error::Error for GoRoundError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match *self {
            GoRoundError::FetchError(ref err) => Some(err),
            GoRoundError::ReadError(ref err) => Some(err),
            GoRoundError::EncodeError(ref err) => Some(err),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for GoRoundError {
    fn from(err: reqwest::Error) -> GoRoundError {
        return GoRoundError::FetchError(err);
    }
}

impl From<std::io::Error> for GoRoundError {
    fn from(err: std::io::Error) -> GoRoundError {
        return GoRoundError::ReadError(err);
    }
}

impl From<serde_xml_rs::Error> for GoRoundError {
    fn from(err: serde_xml_rs::Error) -> GoRoundError {
        return GoRoundError::ParseError(err.to_string());
    }
}

impl From<serde_json::Error> for GoRoundError {
    fn from(err: serde_json::Error) -> GoRoundError {
        return GoRoundError::EncodeError(err);
    }
}
