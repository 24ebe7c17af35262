extern crate regex;
extern crate serde_json;

use crate::config;
use crate::nextbus;
use crate::result;

pub const NO_PREDICTIONS: &str = "No predictions available";

// Used only when serde_json can't encode the envelope.
const ENCODE_FAILURE_BODY: &str =
    r#"{"text": "Error: Couldn't marshal the response... weird.", "username": "Emery Go Round"}"#;

lazy_static! {
    // "bus 5319", "5319 ", or just "5319".
    static ref STOP_MATCHER: regex::Regex =
        regex::Regex::new(r"(?:^|\s)([0-9]+)\s*$").expect("stop matcher");
}

#[derive(Serialize, Debug)]
struct ChatResponse<'a> {
    text: &'a str,
    username: &'a str,
}

/// Pulls an explicit stop id off the end of the command text, if there is one.
pub fn extract_stop_id(text: Option<&str>, default_stop_id: &str) -> String {
    return text
        .and_then(|t| STOP_MATCHER.captures(t))
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .unwrap_or(default_stop_id.to_string());
}

/// 0 -> "0s", 90 -> "1m30s", 3600 -> "1h", 3661 -> "1h1m1s".
/// Units with a zero value are left out. Negative waits count as zero.
pub fn format_wait(seconds: i64) -> String {
    let seconds = seconds.max(0);
    if seconds == 0 {
        return "0s".to_string();
    }

    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    let secs = seconds % 60;

    let mut out = String::new();
    if hours > 0 {
        out.push_str(&format!("{}h", hours));
    }
    if minutes > 0 {
        out.push_str(&format!("{}m", minutes));
    }
    if secs > 0 {
        out.push_str(&format!("{}s", secs));
    }
    return out;
}

/// The feed's ordering is taken as-is: the first prediction of the first
/// direction is the next bus, even if a later one has a smaller wait.
pub fn next_bus(feed: &nextbus::PredictionFeed) -> Option<(&nextbus::Direction, &nextbus::Prediction)> {
    let direction = feed.directions.first()?;
    let prediction = direction.predictions.first()?;
    return Some((direction, prediction));
}

pub fn describe_next_bus(feed: &nextbus::PredictionFeed) -> String {
    match next_bus(feed) {
        None => return NO_PREDICTIONS.to_string(),
        Some((direction, prediction)) => {
            return format!("{} bus #{} going {} will arrive at {} in {}",
                           feed.agency_title,
                           prediction.vehicle,
                           direction.title,
                           feed.stop_title,
                           format_wait(prediction.seconds));
        },
    }
}

pub fn encode_response(text: &str, username: &str) -> result::GoRoundResult<String> {
    let body = serde_json::to_string(&ChatResponse{
        text: text,
        username: username,
    })?;
    return Ok(body);
}

pub struct Responder<F> {
    config: config::Config,
    fetch_fn: F,
}

impl<F> Responder<F> where F: Fn(&str) -> result::GoRoundResult<Vec<u8>> {
    pub fn new(config: config::Config, fetch_fn: F) -> Responder<F> {
        return Responder{
            config: config,
            fetch_fn: fetch_fn,
        };
    }

    /// The JSON body for a request whose `text` field was `text`.
    pub fn respond(&self, text: Option<&str>) -> String {
        return self.render(self.next_bus_message(text));
    }

    /// Wraps a message, or the error that replaced it, in the chat envelope.
    pub fn render(&self, message: result::GoRoundResult<String>) -> String {
        let text = match message {
            Ok(text) => text,
            Err(err) => {
                warn!("Request failed: {}", err);
                err.to_string()
            },
        };

        match encode_response(&text, &self.config.username) {
            Ok(body) => return body,
            Err(err) => {
                error!("{}", err);
                return ENCODE_FAILURE_BODY.to_string();
            },
        }
    }

    fn next_bus_message(&self, text: Option<&str>) -> result::GoRoundResult<String> {
        let stop_id = extract_stop_id(text, &self.config.default_stop_id);
        info!("Predictions requested for stop {}", stop_id);

        let url = nextbus::predictions_url(&self.config, &stop_id)?;
        let raw_xml = (self.fetch_fn)(url.as_str())?;
        let feed = nextbus::parse_predictions(&raw_xml)?;

        let message = describe_next_bus(&feed);
        info!("Stop {} ({}): {}", stop_id, feed.route_title, message);
        return Ok(message);
    }
}

#[cfg(test)]
mod tests {
    use super::result;

    fn golden_fetcher(name: &'static str) -> impl Fn(&str) -> result::GoRoundResult<Vec<u8>> {
        return move |_: &str| Ok(std::fs::read(format!("testdata/{}", name))
                                 .expect("Error reading golden file"));
    }

    fn parse_json(body: &str) -> serde_json::Value {
        return serde_json::from_str(body).expect("response should be JSON");
    }

    fn text_of(body: &str) -> String {
        return parse_json(body)["text"].as_str().expect("text field").to_string();
    }

    #[test]
    fn stop_ids() {
        assert_eq!("5319", super::extract_stop_id(Some("bus 5319"), "1"));
        assert_eq!("42", super::extract_stop_id(Some("when is the bus at 42  "), "5319"));
        assert_eq!("42", super::extract_stop_id(Some("42"), "5319"));
        assert_eq!("5319", super::extract_stop_id(Some(""), "5319"));
        assert_eq!("5319", super::extract_stop_id(None, "5319"));
        assert_eq!("5319", super::extract_stop_id(Some("next bus please"), "5319"));
        assert_eq!("5319", super::extract_stop_id(Some("bus5319"), "5319"));
        assert_eq!("5319", super::extract_stop_id(Some("bus 42 now"), "5319"));
    }

    #[test]
    fn waits() {
        assert_eq!("0s", super::format_wait(0));
        assert_eq!("59s", super::format_wait(59));
        assert_eq!("1m", super::format_wait(60));
        assert_eq!("1m30s", super::format_wait(90));
        assert_eq!("1h", super::format_wait(3600));
        assert_eq!("1h1m1s", super::format_wait(3661));
        assert_eq!("2h5s", super::format_wait(7205));
        assert_eq!("0s", super::format_wait(-20));
    }

    #[test]
    fn happy_path() {
        let responder = super::Responder::new(
            super::config::Config::default(), golden_fetcher("predictions.xml"));

        let body = responder.respond(Some("bus 5319"));

        assert_eq!(serde_json::json!({
            "text": "AC Transit bus #1234 going Outbound will arrive at MLK at 40th in 1m30s",
            "username": "Emery Go Round",
        }), parse_json(&body));
    }

    #[test]
    fn raw_ampersands_end_to_end() {
        let responder = super::Responder::new(
            super::config::Config::default(), golden_fetcher("predictions_bad_amps.xml"));

        assert_eq!(
            "Emery Go-Round bus #E-17 going To Bay St & 40th will arrive at Powell St & Christie Ave in 5m12s",
            text_of(&responder.respond(None)));
    }

    #[test]
    fn empty_route_listed_first() {
        let responder = super::Responder::new(
            super::config::Config::default(), golden_fetcher("multi_route.xml"));

        assert_eq!("Emery Go-Round bus #E-3 going To Powell will arrive at Amtrak in 4m",
                   text_of(&responder.respond(Some("bus 1008"))));
    }

    #[test]
    fn fetches_requested_stop() {
        let requested = std::cell::RefCell::new(vec![]);
        let responder = super::Responder::new(super::config::Config::default(), |url: &str| {
            requested.borrow_mut().push(url.to_string());
            return Ok(std::fs::read("testdata/predictions.xml").expect("golden"));
        });

        responder.respond(Some("stop 1234"));
        responder.respond(None);

        assert_eq!(vec![
            "http://webservices.nextbus.com/service/publicXMLFeed?command=predictions&a=emery&stopId=1234".to_string(),
            "http://webservices.nextbus.com/service/publicXMLFeed?command=predictions&a=emery&stopId=5319".to_string(),
        ], *requested.borrow());
    }

    #[test]
    fn no_directions() {
        let responder = super::Responder::new(
            super::config::Config::default(), golden_fetcher("no_predictions.xml"));

        assert_eq!(serde_json::json!({
            "text": "No predictions available",
            "username": "Emery Go Round",
        }), parse_json(&responder.respond(None)));
    }

    #[test]
    fn upstream_error_body_means_no_predictions() {
        let responder = super::Responder::new(
            super::config::Config::default(), golden_fetcher("nextbus_error.xml"));
        assert_eq!(super::NO_PREDICTIONS, text_of(&responder.respond(Some("bus 99999"))));
    }

    #[test]
    fn direction_without_predictions() {
        let responder = super::Responder::new(super::config::Config::default(), |_: &str| {
            return Ok(br#"<body><predictions agencyTitle="A" stopTitle="S">
                          <direction title="Empty"></direction>
                          <direction title="Full"><prediction seconds="5" vehicle="9"/></direction>
                          </predictions></body>"#.to_vec());
        });
        assert_eq!(super::NO_PREDICTIONS, text_of(&responder.respond(None)));
    }

    #[test]
    fn malformed_xml() {
        let responder = super::Responder::new(super::config::Config::default(), |_: &str| {
            return Ok(b"<body><predictions agencyTitle=".to_vec());
        });

        let body = parse_json(&responder.respond(None));
        assert_eq!("Emery Go Round", body["username"]);
        assert!(body["text"].as_str().unwrap()
                .starts_with("Error: Couldn't unmarshal XML from nextbus: "));
    }

    #[test]
    fn read_failure() {
        let responder = super::Responder::new(super::config::Config::default(), |_: &str| {
            return Err(std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset by peer").into());
        });

        assert_eq!("Error: Couldn't read response from nextbus: reset by peer",
                   text_of(&responder.respond(None)));
    }

    #[test]
    fn rendered_form_error() {
        let responder = super::Responder::new(super::config::Config::default(), |_: &str| {
            panic!("should not fetch");
        });

        let body = responder.render(Err(result::GoRoundError::FormParseError(
            "body is not UTF-8".to_string())));
        assert_eq!(serde_json::json!({
            "text": "Error: Error parsing form data: body is not UTF-8",
            "username": "Emery Go Round",
        }), parse_json(&body));
    }

    #[test]
    fn quotes_are_escaped() {
        let body = super::encode_response("say \"hi\"\n", "Emery Go Round").unwrap();
        assert_eq!(r#"{"text":"say \"hi\"\n","username":"Emery Go Round"}"#, body);
    }

    #[test]
    fn encode_failure_body_is_json() {
        assert_eq!("Emery Go Round", parse_json(super::ENCODE_FAILURE_BODY)["username"]);
    }
}
