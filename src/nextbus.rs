// http://webservices.nextbus.com/service/publicXMLFeed?command=predictions&a=emery&stopId=5319
// yields (abridged):
//
// <body copyright="All data copyright Emery Go-Round 2015.">
//   <predictions agencyTitle="Emery Go-Round" routeTitle="Hollis" stopTitle="Amtrak">
//     <direction title="To Powell">
//       <prediction epochTime="..." seconds="90" minutes="1" vehicle="1234" .../>
//     </direction>
//     <message text="..."/>
//   </predictions>
// </body>
//
// A stop served by several routes gets one <predictions> per route, and
// routes with nothing coming still show up, empty, often first. An unknown
// stop gives a <body> holding only an <Error> element.
//
// serde-xml-rs wants repeated elements to be contiguous: a <message> wedged
// between two <direction>s is a "duplicate field" error. NextBus puts the
// messages last.
extern crate reqwest;
extern crate serde;
extern crate serde_xml_rs;
extern crate std;

use crate::config;
use crate::result;
use crate::sanitize;

const USER_AGENT: &str = "goround (Emery Go Round chat bot)";

// Attribute keys carry an '@' prefix in newer serde-xml-rs releases and none
// in older ones, so every attribute is matched both ways.

#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct Prediction {
    // Missing attributes read as 0 / "" rather than failing the whole feed.
    #[serde(rename = "@seconds", alias = "seconds", default)]
    pub seconds: i64,
    #[serde(rename = "@vehicle", alias = "vehicle", default)]
    pub vehicle: String,
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct Direction {
    #[serde(rename = "@title", alias = "title", default)]
    pub title: String,
    #[serde(rename = "prediction", default)]
    pub predictions: Vec<Prediction>,
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct PredictionFeed {
    #[serde(rename = "@agencyTitle", alias = "agencyTitle")]
    pub agency_title: String,
    #[serde(rename = "@routeTitle", alias = "routeTitle", default)]
    pub route_title: String,
    #[serde(rename = "@stopTitle", alias = "stopTitle")]
    pub stop_title: String,
    #[serde(rename = "direction", default)]
    pub directions: Vec<Direction>,
}

impl PredictionFeed {
    pub fn empty() -> PredictionFeed {
        return PredictionFeed{
            agency_title: "".to_string(),
            route_title: "".to_string(),
            stop_title: "".to_string(),
            directions: vec![],
        };
    }
}

// Whatever the root element is. For the live feed that's <body> and the data
// is in `predictions`, one per route; a bare <predictions> root fills in the
// rest.
#[derive(Deserialize, Debug)]
struct FeedDocument {
    #[serde(rename = "predictions", default)]
    predictions: Vec<PredictionFeed>,

    #[serde(rename = "@agencyTitle", alias = "agencyTitle", default)]
    agency_title: Option<String>,
    #[serde(rename = "@routeTitle", alias = "routeTitle", default)]
    route_title: Option<String>,
    #[serde(rename = "@stopTitle", alias = "stopTitle", default)]
    stop_title: Option<String>,
    #[serde(rename = "direction", default)]
    directions: Vec<Direction>,
}

impl FeedDocument {
    fn into_feed(self) -> result::GoRoundResult<PredictionFeed> {
        if !self.predictions.is_empty() {
            return Ok(merge_routes(self.predictions));
        }

        match (self.agency_title, self.stop_title) {
            (Some(agency_title), Some(stop_title)) => {
                return Ok(PredictionFeed{
                    agency_title: agency_title,
                    route_title: self.route_title.unwrap_or_default(),
                    stop_title: stop_title,
                    directions: self.directions,
                });
            },
            (None, None) if self.directions.is_empty() => {
                return Ok(PredictionFeed::empty());
            },
            _ => {
                return Err(result::GoRoundError::ParseError(
                    "predictions element is missing agencyTitle or stopTitle".to_string()));
            },
        }
    }
}

// Directions from every route, in feed order; titles from the last route.
fn merge_routes(routes: Vec<PredictionFeed>) -> PredictionFeed {
    let mut merged = PredictionFeed::empty();
    for route in routes {
        merged.agency_title = route.agency_title;
        merged.route_title = route.route_title;
        merged.stop_title = route.stop_title;
        merged.directions.extend(route.directions);
    }
    return merged;
}

pub fn predictions_url(config: &config::Config, stop_id: &str) -> result::GoRoundResult<reqwest::Url> {
    let base = format!("{}/service/publicXMLFeed", config.feed_host);
    return reqwest::Url::parse_with_params(&base, &[
        ("command", "predictions"),
        ("a", config.agency.as_str()),
        ("stopId", stop_id),
    ]).map_err(|e| result::make_error(&format!("Bad feed URL '{}': {}", base, e)));
}

pub fn build_client(timeout: std::time::Duration) -> result::GoRoundResult<reqwest::blocking::Client> {
    let client = reqwest::blocking::Client::builder()
        .timeout(timeout)
        .build()?;
    return Ok(client);
}

pub fn fetch_predictions(client: &reqwest::blocking::Client, url: &str) -> result::GoRoundResult<Vec<u8>> {
    use std::io::Read;

    debug!("Fetching {}", url);
    let mut response = client.get(url)
        .header(reqwest::header::USER_AGENT, USER_AGENT)
        .send()?
        .error_for_status()?;
    let mut response_body = vec![];
    response.read_to_end(&mut response_body)?;
    debug!("Read {} bytes from NextBus", response_body.len());
    return Ok(response_body);
}

pub fn parse_predictions(raw_xml: &[u8]) -> result::GoRoundResult<PredictionFeed> {
    let fixed_xml = sanitize::fix_xml_amps(raw_xml);
    let document: FeedDocument = serde_xml_rs::from_reader(&fixed_xml[..])?;
    return document.into_feed();
}
