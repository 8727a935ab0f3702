//! Request command implementation.

use std::io::{self, Read};

use anyhow::{Context as _, Result};
use clap::Args;
use serde_json::Value;

use modelmate_http::{ApiRequest, Method};

use crate::output;
use crate::session::Context;

#[derive(Args, Debug)]
pub struct RequestArgs {
    /// HTTP method (GET, POST, PUT, PATCH, DELETE)
    #[arg(value_parser = parse_method)]
    pub method: Method,

    /// Path relative to the API base, e.g. /models/
    pub path: String,

    /// JSON body (use - for stdin)
    #[arg(long, short = 'd')]
    pub data: Option<String>,

    /// Query parameter as key=value; repeatable
    #[arg(long = "query", short = 'q', value_parser = parse_query)]
    pub query: Vec<(String, String)>,
}

fn parse_method(value: &str) -> Result<Method, String> {
    Method::from_bytes(value.to_ascii_uppercase().as_bytes())
        .map_err(|_| format!("invalid HTTP method: {}", value))
}

fn parse_query(value: &str) -> Result<(String, String), String> {
    value
        .split_once('=')
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .ok_or_else(|| format!("expected key=value, got '{}'", value))
}

pub async fn run(args: RequestArgs, context: &Context) -> Result<()> {
    let mut request = ApiRequest::new(args.method, args.path);
    for (key, value) in args.query {
        request = request.with_query(key, value);
    }
    if let Some(data) = args.data {
        request = request.with_body(read_body(&data)?);
    }

    let response = match context.gateway.execute(&request).await {
        Ok(response) => response,
        Err(e) => {
            output::error(&e.user_message());
            return Err(e).context("Request failed");
        }
    };

    let body: Value = response.json().context("Response was not JSON")?;
    if !body.is_null() {
        output::json_pretty(&body)?;
    }

    Ok(())
}

fn read_body(data: &str) -> Result<Value> {
    if data == "-" {
        let mut buf = String::new();
        io::stdin()
            .read_to_string(&mut buf)
            .context("Failed to read from stdin")?;
        serde_json::from_str(&buf).context("Invalid JSON from stdin")
    } else {
        serde_json::from_str(data).context("Invalid JSON in --data")
    }
}
