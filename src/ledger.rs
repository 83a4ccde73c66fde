use std::{
    cmp::Ordering,
    fs::OpenOptions,
    io::{self, BufWriter, Write},
    path::{Path, PathBuf},
};

use crate::extract::{normalize_ws, Proposal};

const UNKNOWN_DATE: &str = "----------";

/// The running, human-readable list of recorded proposals.
///
/// One tab-separated line per proposal: approval date, id, title, link.
#[derive(Debug, Clone)]
pub struct Ledger {
    path: PathBuf,
}

impl Ledger {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn append(&self, proposal: &Proposal) -> io::Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        let mut out = BufWriter::new(file);
        out.write_all(format_line(proposal).as_bytes())?;
        out.flush()
    }
}

pub fn format_line(proposal: &Proposal) -> String {
    let date = proposal
        .approved_at
        .map(|t| t.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| UNKNOWN_DATE.to_string());
    format!(
        "{}\t{}\t{}\t{}\n",
        date,
        proposal.id,
        normalize_ws(&proposal.title),
        proposal.link
    )
}

/// Oldest approval first; undated proposals last. Ties keep their order.
pub fn sort_by_approval(proposals: &mut [Proposal]) {
    proposals.sort_by(|a, b| match (&a.approved_at, &b.approved_at) {
        (Some(a), Some(b)) => a.cmp(b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, FixedOffset};
    use serde_json::json;

    fn proposal(id: &str, approved_at: Option<&str>) -> Proposal {
        Proposal {
            id: id.to_string(),
            title: format!("Proposal {id}"),
            link: format!("https://example.org/idea/detail/{id}"),
            approved_at: approved_at.map(|s| DateTime::<FixedOffset>::parse_from_rfc3339(s).unwrap()),
            payload: json!({}),
        }
    }

    #[test]
    fn line_format() {
        let mut p = proposal("42", Some("2024-03-05T23:30:00+08:00"));
        p.title = "Free\tpublic\ntransport ".to_string();
        assert_eq!(
            format_line(&p),
            "2024-03-05\t42\tFree public transport\thttps://example.org/idea/detail/42\n"
        );
        assert_eq!(
            format_line(&proposal("7", None)),
            "----------\t7\tProposal 7\thttps://example.org/idea/detail/7\n"
        );
    }

    #[test]
    fn sorts_by_approval_date() {
        let mut proposals = vec![
            proposal("a", None),
            proposal("b", Some("2024-03-05T10:00:00+08:00")),
            proposal("c", Some("2024-01-01T00:00:00+08:00")),
            proposal("d", None),
            proposal("e", Some("2024-03-05T10:00:00+08:00")),
        ];
        sort_by_approval(&mut proposals);
        let ids: Vec<_> = proposals.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, ["c", "b", "e", "a", "d"]);
    }

    #[test]
    fn appends_across_calls() {
        let tmp = tempfile::tempdir().unwrap();
        let ledger = Ledger::new(tmp.path().join("logs").join("proposals.log"));

        ledger.append(&proposal("1", Some("2024-01-01T00:00:00+08:00"))).unwrap();
        ledger.append(&proposal("2", None)).unwrap();

        let text = std::fs::read_to_string(ledger.path()).unwrap();
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("2024-01-01\t1\t"));
        assert!(lines[1].starts_with("----------\t2\t"));
    }
}
