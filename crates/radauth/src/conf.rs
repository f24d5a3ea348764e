//! Server block grammar
//!
//! ```text
//! # comment
//! primary {
//!     host     radius1.example.org
//!     secret   s3cret
//!     method   PAP
//!     priority 10
//!     timeout  1500
//! }
//! ```
//!
//! Tokens are separated by whitespace, so values cannot contain spaces.
//! Lines starting with `#` are comments. A block whose name is not followed
//! by `{`, or that is still open at end of input, is skipped. Unknown keys
//! are logged and ignored. Whether a block is complete enough to use is
//! decided later by the registry.

use crate::config::ServerConfig;
use tracing::{debug, warn};

pub fn parse_server_blocks(input: &str) -> Vec<ServerConfig> {
    let mut tokens = input
        .lines()
        .filter(|line| !line.trim_start().starts_with('#'))
        .flat_map(str::split_whitespace);

    let mut servers = Vec::new();
    while let Some(name) = tokens.next() {
        match tokens.next() {
            Some("{") => {}
            other => {
                warn!(block = name, found = ?other, "could not find '{{' after statement name");
                skip_past_closing_brace(&mut tokens);
                continue;
            }
        }

        let mut server = ServerConfig::new(name);
        let mut closed = false;
        while let Some(key) = tokens.next() {
            if key == "}" {
                closed = true;
                break;
            }
            match tokens.next() {
                Some("}") => {
                    warn!(block = name, key, "key without value");
                    closed = true;
                    break;
                }
                None => break,
                Some(value) => {
                    if let Err(e) = server.set_field(key, value) {
                        debug!(block = name, "{}", e);
                    }
                }
            }
        }

        if closed {
            servers.push(server);
        } else {
            warn!(block = name, "reached end of input without closing '}}', block ignored");
        }
    }

    servers
}

fn skip_past_closing_brace<'a>(tokens: &mut impl Iterator<Item = &'a str>) {
    for token in tokens {
        if token == "}" {
            break;
        }
    }
}
