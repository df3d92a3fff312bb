// Reply lines of the control channel.
//
// Every reply block is a sequence of lines closed by an empty line, so a
// client knows when a reply ends even if it has zero rows.

use std::fmt;

pub const TOO_MANY_ARGUMENTS: &str = "too many arguments";
pub const TOO_FEW_ARGUMENTS: &str = "too few arguments";
pub const UNKNOWN_COMMAND: &str = "unknown command";
pub const UNKNOWN_DIRECTORY: &str = "unknown directory";
pub const UNKNOWN_FILE: &str = "unknown file";
pub const PERMISSION_DENIED: &str = "permission denied";
pub const NOT_A_FILE: &str = "not a file";
pub const CONNECTION_TERMINATED: &str = "connection terminated";
pub const TRANSFER_STARTING: &str = "transfer starting: ";

pub fn greeting(peer: &str) -> String {
    format!("{} > connected", peer)
}

pub fn directory_changed(last_segment: &str) -> String {
    format!("{} > OK", last_segment)
}

pub fn transfer_starting(file_name: &str) -> String {
    format!("{}{}", TRANSFER_STARTING, file_name)
}

/// Extracts the announced file name from a `transfer starting` line.
pub fn parse_transfer_starting(line: &str) -> Option<&str> {
    line.strip_prefix(TRANSFER_STARTING)
        .map(str::trim)
        .filter(|name| !name.is_empty())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    Directory,
    File,
}

impl EntryKind {
    pub fn tag(&self) -> &'static str {
        match self {
            EntryKind::Directory => "<dir>",
            EntryKind::File => "<file>",
        }
    }
}

/// One `ls` row. Directory sizes are the recursive sum of contained files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingRow {
    pub kind: EntryKind,
    pub name: String,
    pub size: u64,
}

impl fmt::Display for ListingRow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let row = format!("{:<9}{:<20}{:<20}", self.kind.tag(), self.name, self.size);
        f.write_str(row.trim_end())
    }
}
