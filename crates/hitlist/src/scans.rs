//! Scan numbers, spectrum indices and merged-spectrum groups

use fnv::FnvHashMap;
use serde::Serialize;

/// Split a `/`-delimited merged field (`3010/3011/3012`) into its parts
pub fn split_merged(field: &str) -> Vec<&str> {
    field.split('/').map(str::trim).collect()
}

/// Part `ix` of a merged field; a field with a single value is shared by
/// every sub-scan
pub fn merged_part<'a>(parts: &[&'a str], ix: usize) -> &'a str {
    match parts.len() {
        0 => "",
        1 => parts[0],
        _ => parts.get(ix).copied().unwrap_or_default(),
    }
}

/// Extract the numeric part of a spectrum identifier: `index=5` → `5`,
/// `controllerType=0 controllerNumber=1 scan=12` → `12`. Anything else is
/// returned unchanged.
pub fn normalize_spec_index(spec_id: &str) -> &str {
    let spec_id = spec_id.trim();
    for key in ["index=", "scan="] {
        if let Some(value) = token_value(spec_id, key) {
            return value;
        }
    }
    spec_id
}

/// Recover a scan number from a `scan=N` token in a spectrum identifier
pub fn scan_from_spec_id(spec_id: &str) -> Option<u32> {
    token_value(spec_id, "scan=").and_then(|v| v.parse().ok())
}

fn token_value<'a>(spec_id: &'a str, key: &str) -> Option<&'a str> {
    spec_id
        .split_ascii_whitespace()
        .find_map(|token| token.strip_prefix(key))
        .filter(|v| !v.is_empty())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ScanGroupMember {
    pub group: usize,
    pub charge: u8,
    pub scan: u32,
}

/// Allocates group IDs for spectra that the search engine merged before
/// searching. Every row gets a group; only groups with more than one scan are
/// worth writing out.
#[derive(Debug, Default, Clone)]
pub struct ScanGroups {
    ids: FnvHashMap<(Vec<u32>, u8), usize>,
    members: Vec<ScanGroupMember>,
    merged: bool,
}

impl ScanGroups {
    /// Group ID for the scan list of one row. Rows repeating the same scans
    /// and charge share the ID.
    pub fn assign(&mut self, scans: &[u32], charge: u8) -> usize {
        let key = (scans.to_vec(), charge);
        if let Some(&id) = self.ids.get(&key) {
            return id;
        }
        let id = self.ids.len() + 1;
        self.ids.insert(key, id);
        if scans.len() > 1 {
            self.merged = true;
        }
        self.members.extend(scans.iter().map(|&scan| ScanGroupMember {
            group: id,
            charge,
            scan,
        }));
        id
    }

    /// Did any group contain more than one scan?
    pub fn has_merged(&self) -> bool {
        self.merged
    }

    pub fn members(&self) -> &[ScanGroupMember] {
        &self.members
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn spec_index() {
        assert_eq!(normalize_spec_index("index=5"), "5");
        assert_eq!(
            normalize_spec_index("controllerType=0 controllerNumber=1 scan=12"),
            "12"
        );
        assert_eq!(normalize_spec_index("17"), "17");
        assert_eq!(scan_from_spec_id("controllerType=0 controllerNumber=1 scan=12"), Some(12));
        assert_eq!(scan_from_spec_id("index=5"), None);
    }

    #[test]
    fn merged() {
        let scans = split_merged("3010/3011/3012");
        assert_eq!(scans, vec!["3010", "3011", "3012"]);
        assert_eq!(merged_part(&["HCD"], 2), "HCD");
        assert_eq!(merged_part(&["CID", "ETD"], 1), "ETD");
        assert_eq!(merged_part(&["CID", "ETD"], 2), "");
    }

    #[test]
    fn groups() {
        let mut groups = ScanGroups::default();
        let a = groups.assign(&[100], 2);
        let b = groups.assign(&[100], 3);
        assert_ne!(a, b);
        assert!(!groups.has_merged());

        let c = groups.assign(&[200, 201], 2);
        assert_eq!(groups.assign(&[200, 201], 2), c);
        assert!(groups.has_merged());
        assert_eq!(groups.members().len(), 4);
        assert_eq!(groups.members()[3], ScanGroupMember { group: c, charge: 2, scan: 201 });
    }
}
