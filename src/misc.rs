// Copyright (C) 2026 vipr contributors
//
// Permission is hereby granted, free of charge, to any
// person obtaining a copy of this software and associated
// documentation files (the "Software"), to deal in the
// Software without restriction, including without
// limitation the rights to use, copy, modify, merge,
// publish, distribute, sublicense, and/or sell copies of
// the Software, and to permit persons to whom the Software
// is furnished to do so, subject to the following
// conditions:
//
// The above copyright notice and this permission notice
// shall be included in all copies or substantial portions
// of the Software.
//
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF
// ANY KIND, EXPRESS OR IMPLIED, INCLUDING BUT NOT LIMITED
// TO THE WARRANTIES OF MERCHANTABILITY, FITNESS FOR A
// PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT
// SHALL THE AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY
// CLAIM, DAMAGES OR OTHER LIABILITY, WHETHER IN AN ACTION
// OF CONTRACT, TORT OR OTHERWISE, ARISING FROM, OUT OF OR
// IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER
// DEALINGS IN THE SOFTWARE.

use rand::Rng;
use regex::Regex;

use super::data::InitiatorProtocol;
use super::error::*;

const URI_PREFIX: &str = "urn:storageos:";
const UNIQUE_CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

struct SizeUnit<'a> {
    unit: &'a str,
    bytes: u64,
}

const SIZE_CONVS: [SizeUnit<'static>; 5] = [
    SizeUnit {
        unit: "PiB",
        bytes: 1u64 << 50,
    },
    SizeUnit {
        unit: "TiB",
        bytes: 1u64 << 40,
    },
    SizeUnit {
        unit: "GiB",
        bytes: 1u64 << 30,
    },
    SizeUnit {
        unit: "MiB",
        bytes: 1u64 << 20,
    },
    SizeUnit {
        unit: "KiB",
        bytes: 1u64 << 10,
    },
];

/// Convert a size string as accepted by the controller CLI into bytes.
///
/// Multiples are binary and case insensitive, with an optional `B` or `iB`
/// after the unit letter:
///
///  * `10G`, `10GB` and `10GiB` all give `10 * (1 << 30)`.
///  * `1.5k` gives `1536`.
///  * `4096` gives `4096`.
///
/// Return `None` if the string is not a size.
pub fn to_bytes(s: &str) -> Option<u64> {
    let regex_size = Regex::new(
        r"(?xi)
        ^
        ([0-9]+(?:\.[0-9]+)?)   # 1: number
        [\ \t]*
        (?:([KMGTP])(?:I?B)?)?  # 2: unit letter
        $
        ",
    )
    .ok()?;
    let cap = regex_size.captures(s.trim())?;
    let number = cap.get(1)?.as_str().parse::<f64>().ok()?;
    let multiple = match cap.get(2) {
        None => 1u64,
        Some(u) => {
            let letter = u.as_str().to_uppercase();
            SIZE_CONVS
                .iter()
                .find(|c| c.unit.starts_with(letter.as_str()))?
                .bytes
        }
    };
    let bytes = number * multiple as f64;
    if bytes > u64::max_value() as f64 {
        return None;
    }
    Some(bytes as u64)
}

pub fn size_bytes_2_size_human(i: u64) -> String {
    let mut unit = "B";
    let mut num = i as f64;
    for size_conv in &SIZE_CONVS {
        if i >= size_conv.bytes {
            num = (i as f64) / (size_conv.bytes as f64);
            unit = size_conv.unit;
            break;
        }
    }
    format!("{:.2}{}", num, unit)
}

/// Whether `s` is a controller resource URI rather than a name.
pub fn is_uri(s: &str) -> bool {
    s.starts_with(URI_PREFIX)
}

/// Split `tenant/project/name` style paths at the last `/`.
///
/// A path without `/` has an empty parent.
pub fn parent_child_from_path(path: &str) -> (&str, &str) {
    match path.rfind('/') {
        Some(i) => (&path[..i], &path[i + 1..]),
        None => ("", path),
    }
}

/// Check an initiator port identifier is valid for `protocol`.
///
/// iSCSI ports must be IQN, EUI or NAA names; FC ports 8-byte WWPNs, with
/// or without separators.
pub fn verify_initiator_port(
    port: &str,
    protocol: InitiatorProtocol,
) -> Result<()> {
    let valid = match protocol {
        InitiatorProtocol::Fc => {
            let regex_wwpn = Regex::new(
                r"(?x)
                ^(?:0x|0X)?(?:[0-9A-Fa-f]{2})
                (?:(?:[\.:\-])?[0-9A-Fa-f]{2}){7}$
                ",
            )?;
            regex_wwpn.is_match(port)
        }
        InitiatorProtocol::Iscsi => {
            port.starts_with("iqn.")
                || port.starts_with("eui.")
                || port.starts_with("naa.")
        }
    };
    if valid {
        Ok(())
    } else {
        Err(ViprError::InvalidArgument(format!(
            "Invalid {} initiator port '{}'",
            protocol, port
        )))
    }
}

/// `len` random characters from `[A-Z0-9]`.
pub fn unique_suffix(len: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..len)
        .map(|_| UNIQUE_CHARSET[rng.gen_range(0..UNIQUE_CHARSET.len())] as char)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn size_strings() {
        assert_eq!(to_bytes("10G"), Some(10 << 30));
        assert_eq!(to_bytes("10gb"), Some(10 << 30));
        assert_eq!(to_bytes("10 GiB"), Some(10 << 30));
        assert_eq!(to_bytes("1.5k"), Some(1536));
        assert_eq!(to_bytes("2T"), Some(2 << 40));
        assert_eq!(to_bytes("4096"), Some(4096));
        assert_eq!(to_bytes("G"), None);
        assert_eq!(to_bytes("10X"), None);
        assert_eq!(to_bytes("-1G"), None);
        assert_eq!(to_bytes(""), None);
    }

    #[test]
    fn human_sizes() {
        assert_eq!(size_bytes_2_size_human(512), "512.00B");
        assert_eq!(size_bytes_2_size_human(1 << 30), "1.00GiB");
        assert_eq!(size_bytes_2_size_human(1536), "1.50KiB");
    }

    #[test]
    fn paths() {
        assert_eq!(
            parent_child_from_path("acme/openstack/vol1"),
            ("acme/openstack", "vol1")
        );
        assert_eq!(parent_child_from_path("/openstack"), ("", "openstack"));
        assert_eq!(parent_child_from_path("vol1"), ("", "vol1"));
        assert!(is_uri("urn:storageos:Volume:1:vdc1"));
        assert!(!is_uri("vol1"));
    }

    #[test]
    fn initiator_ports() {
        let iscsi = InitiatorProtocol::Iscsi;
        let fc = InitiatorProtocol::Fc;
        assert!(verify_initiator_port("iqn.1993-08.org.debian:01:aa", iscsi)
            .is_ok());
        assert!(verify_initiator_port("10:00:00:00:c9:12:34:56", fc).is_ok());
        assert!(verify_initiator_port("0x10000000c9123456", fc).is_ok());
        assert!(verify_initiator_port("10:00:00:00:c9:12:34", fc).is_err());
        assert!(verify_initiator_port("host1", iscsi).is_err());
    }

    #[test]
    fn suffix_charset() {
        let s = unique_suffix(6);
        assert_eq!(s.len(), 6);
        assert!(s
            .chars()
            .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()));
    }
}
