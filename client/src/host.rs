//
// Copyright 2017-2026 Hans W. Uhlig. All Rights Reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//

//! Host argument validation
//!
//! A host is accepted if it is a dotted-quad IPv4 literal, a colon-separated
//! IPv6 literal, or an RFC 1123 hostname.

/// Maximum length of a hostname
const MAX_HOSTNAME_LENGTH: usize = 253;
/// Maximum length of one hostname label
const MAX_LABEL_LENGTH: usize = 63;

/// Check whether `host` is an IPv4 literal, IPv6 literal or hostname
pub fn is_valid_host(host: &str) -> bool {
    is_ipv4(host) || is_ipv6(host) || is_hostname(host)
}

/// Check for four decimal parts in 0..=255 without leading zeros
pub fn is_ipv4(host: &str) -> bool {
    let parts: Vec<&str> = host.split('.').collect();
    parts.len() == 4
        && parts.iter().all(|part| {
            !part.is_empty()
                && part.bytes().all(|b| b.is_ascii_digit())
                && (*part == "0" || !part.starts_with('0'))
                && part.parse::<u8>().is_ok()
        })
}

/// Check for 3 to 8 colon-separated groups of at most four hex digits
///
/// At most two groups may be empty, and two empty groups are only allowed
/// when they come from a single `::`.
pub fn is_ipv6(host: &str) -> bool {
    let parts: Vec<&str> = host.split(':').collect();
    if !(3..=8).contains(&parts.len()) {
        return false;
    }

    let groups_valid = parts
        .iter()
        .all(|part| part.len() <= 4 && part.bytes().all(|b| b.is_ascii_hexdigit()));
    if !groups_valid {
        return false;
    }

    match parts.iter().filter(|part| part.is_empty()).count() {
        0 | 1 => true,
        2 => host.matches("::").count() == 1,
        _ => false,
    }
}

/// Check for dot-separated labels of letters, digits and hyphens
///
/// Each label is 1 to 63 characters and starts and ends with a letter or
/// digit; the whole name is at most 253 characters.
pub fn is_hostname(host: &str) -> bool {
    if host.is_empty() || host.len() > MAX_HOSTNAME_LENGTH {
        return false;
    }

    host.split('.').all(|label| {
        let bytes = label.as_bytes();
        match (bytes.first(), bytes.last()) {
            (Some(first), Some(last)) => {
                bytes.len() <= MAX_LABEL_LENGTH
                    && first.is_ascii_alphanumeric()
                    && last.is_ascii_alphanumeric()
                    && bytes.iter().all(|b| b.is_ascii_alphanumeric() || *b == b'-')
            }
            _ => false,
        }
    })
}
