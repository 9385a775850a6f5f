use std::io::Write;

use crate::errors::TargetUnavailable;

use super::unit::{EntryView, RenderUnit};

/// Sink the scheduler writes into. Owned by the host UI layer; the core never
/// reads it back.
///
/// A render cycle calls `clear` exactly once before its first `append`.
pub trait RenderTarget {
    fn clear(&mut self) -> Result<(), TargetUnavailable>;
    fn append(&mut self, unit: RenderUnit) -> Result<(), TargetUnavailable>;
}

/// Everything a [`MemoryTarget`] was asked to do, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetEvent {
    Clear,
    Append(RenderUnit),
}

/// In-memory surface. Keeps the current content plus the full call history,
/// and can be detached to stand in for a vanished mount point.
#[derive(Debug, Default)]
pub struct MemoryTarget {
    units: Vec<RenderUnit>,
    events: Vec<TargetEvent>,
    detached: bool,
}

impl MemoryTarget {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subsequent calls fail with [`TargetUnavailable`].
    pub fn detach(&mut self) {
        self.detached = true;
    }

    pub fn attach(&mut self) {
        self.detached = false;
    }

    pub fn is_detached(&self) -> bool {
        self.detached
    }

    /// Content since the last successful `clear`.
    pub fn units(&self) -> &[RenderUnit] {
        &self.units
    }

    pub fn events(&self) -> &[TargetEvent] {
        &self.events
    }

    pub fn clear_count(&self) -> usize {
        self.events
            .iter()
            .filter(|event| matches!(event, TargetEvent::Clear))
            .count()
    }

    pub fn headers(&self) -> Vec<&str> {
        self.units
            .iter()
            .filter_map(|unit| match unit {
                RenderUnit::DateHeader { date } => Some(date.as_str()),
                _ => None,
            })
            .collect()
    }

    pub fn entries(&self) -> impl Iterator<Item = &EntryView> {
        self.units.iter().flat_map(|unit| match unit {
            RenderUnit::Entries { entries, .. } => entries.as_slice(),
            _ => &[][..],
        })
    }

    fn check_attached(&self) -> Result<(), TargetUnavailable> {
        if self.detached {
            Err(TargetUnavailable::new("memory target detached"))
        } else {
            Ok(())
        }
    }
}

impl RenderTarget for MemoryTarget {
    fn clear(&mut self) -> Result<(), TargetUnavailable> {
        self.check_attached()?;
        self.units.clear();
        self.events.push(TargetEvent::Clear);
        Ok(())
    }

    fn append(&mut self, unit: RenderUnit) -> Result<(), TargetUnavailable> {
        self.check_attached()?;
        self.events.push(TargetEvent::Append(unit.clone()));
        self.units.push(unit);
        Ok(())
    }
}

/// Plain-text surface over any writer. `clear` prints a rule since a
/// stream cannot be rewound.
pub struct TextTarget<W: Write> {
    writer: W,
}

impl<W: Write> TextTarget<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }

    fn write_unit(&mut self, unit: &RenderUnit) -> std::io::Result<()> {
        match unit {
            RenderUnit::DateHeader { date } => writeln!(self.writer, "\n## {date}"),
            RenderUnit::Entries { entries, .. } => {
                for entry in entries {
                    writeln!(self.writer, "* {} ({})", entry.game, entry.company)?;
                    writeln!(self.writer, "  {}", entry.title)?;
                    if !entry.summary.is_empty() {
                        writeln!(self.writer, "  {}", entry.summary)?;
                    }
                    if !entry.link.is_empty() {
                        writeln!(self.writer, "  {}: {}", entry.link_label, entry.link)?;
                    }
                }
                Ok(())
            }
            RenderUnit::Notice { notice } => writeln!(self.writer, "{}", notice.message()),
        }
    }
}

impl<W: Write> RenderTarget for TextTarget<W> {
    fn clear(&mut self) -> Result<(), TargetUnavailable> {
        writeln!(self.writer, "{}", "-".repeat(40))
            .map_err(|err| TargetUnavailable::new(err.to_string()))
    }

    fn append(&mut self, unit: RenderUnit) -> Result<(), TargetUnavailable> {
        self.write_unit(&unit)
            .and_then(|_| self.writer.flush())
            .map_err(|err| TargetUnavailable::new(err.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Record;
    use crate::render::Notice;

    fn entries_unit() -> RenderUnit {
        let record = Record {
            date: "2024-05-02".into(),
            company: "Square Enix".into(),
            game: "Dragon Quest".into(),
            title: "Patch 1.2".into(),
            summary: "Bug fixes".into(),
            link: "https://example.com/dq".into(),
        };
        RenderUnit::Entries {
            date: "2024-05-02".into(),
            entries: vec![EntryView::from(&record)],
        }
    }

    #[test]
    fn memory_target_clear_resets_content_but_keeps_history() {
        let mut target = MemoryTarget::new();
        target.clear().unwrap();
        target
            .append(RenderUnit::DateHeader {
                date: "2024-05-02".into(),
            })
            .unwrap();
        target.append(entries_unit()).unwrap();
        target.clear().unwrap();

        assert!(target.units().is_empty());
        assert_eq!(target.events().len(), 4);
        assert_eq!(target.clear_count(), 2);
    }

    #[test]
    fn detached_memory_target_rejects_writes() {
        let mut target = MemoryTarget::new();
        target.detach();
        assert!(target.clear().is_err());
        assert!(target.append(entries_unit()).is_err());
        assert!(target.events().is_empty());

        target.attach();
        assert!(target.clear().is_ok());
    }

    #[test]
    fn entry_view_carries_class_and_link_label() {
        let RenderUnit::Entries { entries, .. } = entries_unit() else {
            panic!("expected entries");
        };
        assert_eq!(entries[0].company_class, "company-square-enix");
        assert_eq!(entries[0].link_label, "Official site");
    }

    #[test]
    fn text_target_writes_readable_lines() {
        let mut target = TextTarget::new(Vec::new());
        target.clear().unwrap();
        target
            .append(RenderUnit::DateHeader {
                date: "2024-05-02".into(),
            })
            .unwrap();
        target.append(entries_unit()).unwrap();
        target
            .append(RenderUnit::notice(Notice::NoUpdates))
            .unwrap();

        let text = String::from_utf8(target.into_inner()).unwrap();
        assert!(text.contains("## 2024-05-02"));
        assert!(text.contains("* Dragon Quest (Square Enix)"));
        assert!(text.contains("Official site: https://example.com/dq"));
        assert!(text.contains("No updates to show"));
    }
}
