extern crate anyhow;
extern crate reqwest;
extern crate tiny_http;

use anyhow::Context;
use crate::config;
use crate::responder;
use crate::result;

// Slack's slash command payloads are well under this.
const MAX_FORM_BYTES: u64 = 64 * 1024;

/// Decodes an `application/x-www-form-urlencoded` string ('+' and %XX included).
pub fn decode_form(encoded: &str) -> result::GoRoundResult<Vec<(String, String)>> {
    let mut url = reqwest::Url::parse("http://localhost/")
        .map_err(|e| result::GoRoundError::FormParseError(e.to_string()))?;
    url.set_query(Some(encoded));
    return Ok(url.query_pairs().into_owned().collect());
}

/// The first `text` field, looking at the POST body before the query string.
pub fn form_text(request_url: &str, body: &[u8]) -> result::GoRoundResult<Option<String>> {
    let body = std::str::from_utf8(body)
        .map_err(|e| result::GoRoundError::FormParseError(format!("body is not UTF-8: {}", e)))?;
    let query = match request_url.find('?') {
        Some(i) => &request_url[i + 1..],
        None => "",
    };

    let mut fields = decode_form(body)?;
    fields.extend(decode_form(query)?);

    return Ok(fields.into_iter()
              .find(|(k, _)| k == "text")
              .map(|(_, v)| v));
}

fn read_body(request: &mut tiny_http::Request) -> result::GoRoundResult<Vec<u8>> {
    use std::io::Read;

    if *request.method() != tiny_http::Method::Post {
        return Ok(vec![]);
    }

    let mut body = vec![];
    request.as_reader()
        .take(MAX_FORM_BYTES + 1)
        .read_to_end(&mut body)
        .map_err(|e| result::GoRoundError::FormParseError(e.to_string()))?;

    if body.len() as u64 > MAX_FORM_BYTES {
        return Err(result::GoRoundError::FormParseError(
            format!("request body is larger than {} bytes", MAX_FORM_BYTES)));
    }
    return Ok(body);
}

fn request_text(request: &mut tiny_http::Request) -> result::GoRoundResult<Option<String>> {
    let request_url = request.url().to_string();
    let body = read_body(request)?;
    return form_text(&request_url, &body);
}

fn handle_request<F>(mut request: tiny_http::Request,
                     responder: &responder::Responder<F>,
                     content_type: &tiny_http::Header)
    where F: Fn(&str) -> result::GoRoundResult<Vec<u8>> {
    debug!("{} {} from {:?}", request.method(), request.url(), request.remote_addr());

    let body = match request_text(&mut request) {
        Ok(text) => responder.respond(text.as_deref()),
        Err(err) => responder.render(Err(err)),
    };

    // Always a 200; errors travel in the message text.
    let response = tiny_http::Response::from_string(body)
        .with_status_code(200)
        .with_header(content_type.clone());
    if let Err(err) = request.respond(response) {
        warn!("Couldn't write response: {}", err);
    }
}

pub fn serve(config: config::Config) -> anyhow::Result<()> {
    let content_type: tiny_http::Header = "Content-Type: application/json"
        .parse()
        .map_err(|_| anyhow::anyhow!("bad Content-Type header"))?;

    let client = crate::nextbus::build_client(config.fetch_timeout)
        .context("while building the HTTP client")?;

    let address = config.listen_address();
    let workers = config.workers;
    let server = tiny_http::Server::http(&address)
        .map_err(|e| anyhow::anyhow!("Couldn't listen on {}: {}", address, e))?;
    let server = std::sync::Arc::new(server);

    let responder = std::sync::Arc::new(responder::Responder::new(
        config,
        move |url: &str| crate::nextbus::fetch_predictions(&client, url)));

    info!("Listening on {} with {} workers", address, workers);

    let mut handles = vec![];
    for i in 0..workers {
        let server = server.clone();
        let responder = responder.clone();
        let content_type = content_type.clone();
        handles.push(std::thread::spawn(move || {
            loop {
                match server.recv() {
                    Ok(request) => handle_request(request, &*responder, &content_type),
                    Err(err) => {
                        error!("Worker {} stopping: {}", i, err);
                        break;
                    },
                }
            }
        }));
    }

    for handle in handles {
        if handle.join().is_err() {
            error!("A worker thread panicked");
        }
    }
    return Ok(());
}
