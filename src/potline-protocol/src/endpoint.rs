// SPDX-FileCopyrightText: 2026 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

//! Gateway endpoint URLs (`opc.tcp://host:port/path`).

use std::fmt;

/// Port used when the endpoint URL does not name one.
pub const DEFAULT_PORT: u16 = 4840;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Endpoint {
    pub host: String,
    pub port: u16,
}

impl Endpoint {
    /// Address suitable for `TcpStream::connect`.
    pub fn connect_addr(&self) -> String {
        if self.host.contains(':') && !self.host.starts_with('[') {
            format!("[{}]:{}", self.host, self.port)
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "opc.tcp://{}", self.connect_addr())
    }
}

/// Parse `opc.tcp://`, `tcp://` or bare `host[:port]` endpoint URLs.
/// Any path after the authority is ignored.
pub fn parse_endpoint(url: &str) -> Result<Endpoint, String> {
    let trimmed = url.trim();
    if trimmed.is_empty() {
        return Err("endpoint url is empty".into());
    }

    let rest = trimmed
        .strip_prefix("opc.tcp://")
        .or_else(|| trimmed.strip_prefix("tcp://"))
        .unwrap_or(trimmed);
    if rest.contains("://") {
        return Err(format!("unsupported endpoint scheme in '{trimmed}'"));
    }
    let authority = rest.split('/').next().unwrap_or(rest);

    parse_host_port(authority)
}

fn parse_host_port(input: &str) -> Result<Endpoint, String> {
    if let Some(rest) = input.strip_prefix('[') {
        let closing = rest
            .find(']')
            .ok_or("invalid endpoint: missing closing ']' for IPv6 host")?;
        let host = &rest[..closing];
        let remainder = &rest[closing + 1..];
        if host.is_empty() {
            return Err("invalid endpoint: host is empty".into());
        }
        let port = if remainder.is_empty() {
            DEFAULT_PORT
        } else if let Some(port_str) = remainder.strip_prefix(':') {
            parse_port(port_str)?
        } else {
            return Err("invalid endpoint: expected ':<port>' after ']'".into());
        };
        return Ok(Endpoint {
            host: host.to_string(),
            port,
        });
    }

    if input.contains(':') {
        if input.matches(':').count() > 1 {
            return Err("invalid endpoint: IPv6 host must be bracketed like [::1]:4840".into());
        }
        let (host, port_str) = input
            .rsplit_once(':')
            .ok_or("invalid endpoint: expected host:port")?;
        if host.is_empty() {
            return Err("invalid endpoint: host is empty".into());
        }
        return Ok(Endpoint {
            host: host.to_string(),
            port: parse_port(port_str)?,
        });
    }

    if input.is_empty() {
        return Err("invalid endpoint: host is empty".into());
    }

    Ok(Endpoint {
        host: input.to_string(),
        port: DEFAULT_PORT,
    })
}

fn parse_port(port_str: &str) -> Result<u16, String> {
    let port: u16 = port_str
        .parse()
        .map_err(|_| format!("invalid endpoint port: '{port_str}'"))?;
    if port == 0 {
        return Err("invalid endpoint port: 0".into());
    }
    Ok(port)
}
