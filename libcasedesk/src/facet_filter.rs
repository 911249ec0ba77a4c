//! Enabling and disabling of facet checkboxes according to the visible items.
use derive_more::Display;

use crate::page::OptionRecord;

/// Case-insensitive, whitespace-trimmed facet value.
///
/// Both the checkbox side and the item side are normalized on construction so that
/// matching is a plain equality test.
#[derive(Debug, Clone, Default, Display, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FacetValue(String);

impl FacetValue {
    #[must_use]
    pub fn new(raw: &str) -> Self {
        Self(raw.trim().to_lowercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for FacetValue {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Display)]
pub enum FacetKind {
    #[display("tag")]
    Tag,
    #[display("author")]
    Author,
    /// Matches the item field of that name.
    #[display("{_0}")]
    Field(String),
}

impl FacetKind {
    /// Kind from the checkbox's `data-name`.
    #[must_use]
    pub fn from_name(name: &str) -> Self {
        match name {
            "tag" => FacetKind::Tag,
            "author" => FacetKind::Author,
            other => FacetKind::Field(other.to_string()),
        }
    }

    pub fn matches(&self, item: &OptionRecord, value: &FacetValue) -> bool {
        match self {
            FacetKind::Tag => item.facets.tags.iter().any(|t| t == value),
            FacetKind::Author => item.facets.author.as_ref() == Some(value),
            FacetKind::Field(field) => item.facets.fields.get(field) == Some(value),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FacetRow {
    pub kind: FacetKind,
    pub value: FacetValue,
    pub checked: bool,
    pub disabled: bool,
}

impl FacetRow {
    #[must_use]
    pub fn new(kind: FacetKind, value: &str) -> Self {
        Self {
            kind,
            value: FacetValue::new(value),
            checked: false,
            disabled: false,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FacetGroup {
    pub name: String,
    /// Shown as checkboxes. Non-visual groups are only reachable through the keyword box.
    pub visual: bool,
    /// Free-text keyword group; never disabled by the facet pass.
    pub keyword: bool,
    pub rows: Vec<FacetRow>,
}

impl FacetGroup {
    #[must_use]
    pub fn visual(name: impl Into<String>, rows: Vec<FacetRow>) -> Self {
        Self {
            name: name.into(),
            visual: true,
            keyword: false,
            rows,
        }
    }
}

/// Disables every checkbox of a visual, non-keyword group that no item in `items`
/// matches, and re-enables the others. Returns the number of disabled checkboxes.
pub fn update_facet_availability(groups: &mut [FacetGroup], items: &[OptionRecord]) -> usize {
    let mut disabled = 0;
    for group in groups.iter_mut().filter(|g| g.visual && !g.keyword) {
        for row in &mut group.rows {
            row.disabled = !items.iter().any(|item| row.kind.matches(item, &row.value));
            if row.disabled {
                disabled += 1;
            }
        }
    }
    disabled
}

/// Unchecks every checked checkbox of the visual groups, keyword group included.
/// Returns the values that were unchecked.
pub fn uncheck_all(groups: &mut [FacetGroup]) -> Vec<FacetValue> {
    groups
        .iter_mut()
        .filter(|g| g.visual)
        .flat_map(|g| g.rows.iter_mut())
        .filter(|row| row.checked)
        .map(|row| {
            row.checked = false;
            row.value.clone()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::page::ItemFacets;

    fn item(tags: &[&str], author: Option<&str>, status: &str) -> OptionRecord {
        let mut record = OptionRecord::new("1", "case");
        record.facets = ItemFacets {
            tags: tags.iter().map(|t| FacetValue::new(t)).collect(),
            author: author.map(FacetValue::new),
            fields: [("status".to_string(), FacetValue::new(status))].into(),
        };
        record
    }

    fn groups() -> Vec<FacetGroup> {
        vec![
            FacetGroup::visual(
                "tag",
                vec![
                    FacetRow::new(FacetKind::Tag, "Smoke"),
                    FacetRow::new(FacetKind::Tag, "l10n"),
                ],
            ),
            FacetGroup::visual("author", vec![FacetRow::new(FacetKind::Author, "camd")]),
            FacetGroup::visual(
                "status",
                vec![FacetRow::new(FacetKind::from_name("status"), "active")],
            ),
        ]
    }

    #[test]
    fn facet_value_is_case_insensitive() {
        assert_eq!(FacetValue::new(" Smoke "), FacetValue::new("smoke"));
    }

    #[test]
    fn kind_from_name() {
        assert_eq!(FacetKind::from_name("tag"), FacetKind::Tag);
        assert_eq!(FacetKind::from_name("author"), FacetKind::Author);
        assert_eq!(
            FacetKind::from_name("priority"),
            FacetKind::Field("priority".to_string())
        );
        assert_eq!(FacetKind::Field("priority".to_string()).to_string(), "priority");
    }

    #[test]
    fn disables_unmatched_rows_only() {
        let mut groups = groups();
        let items = vec![item(&["SMOKE"], Some("Camd"), "draft")];
        let disabled = update_facet_availability(&mut groups, &items);
        assert_eq!(disabled, 2);
        assert!(!groups[0].rows[0].disabled);
        assert!(groups[0].rows[1].disabled);
        assert!(!groups[1].rows[0].disabled);
        assert!(groups[2].rows[0].disabled);
    }

    #[test]
    fn re_enables_when_items_change() {
        let mut groups = groups();
        update_facet_availability(&mut groups, &[]);
        assert!(groups.iter().flat_map(|g| &g.rows).all(|r| r.disabled));

        update_facet_availability(&mut groups, &[item(&["l10n"], None, "active")]);
        assert!(!groups[0].rows[1].disabled);
        assert!(!groups[2].rows[0].disabled);
        assert_eq!(groups[0].rows.len(), 2, "rows are never removed");
    }

    #[test]
    fn keyword_and_hidden_groups_are_left_alone() {
        let mut keyword = FacetGroup::visual("name", vec![FacetRow::new(FacetKind::Tag, "x")]);
        keyword.keyword = true;
        let mut hidden = FacetGroup::visual("hidden", vec![FacetRow::new(FacetKind::Tag, "x")]);
        hidden.visual = false;
        let mut groups = vec![keyword, hidden];
        assert_eq!(update_facet_availability(&mut groups, &[]), 0);
        assert!(groups.iter().flat_map(|g| &g.rows).all(|r| !r.disabled));
    }

    #[test]
    fn uncheck_all_includes_keyword_groups() {
        let mut groups = groups();
        groups[0].rows[0].checked = true;
        let mut keyword = FacetGroup::visual("name", vec![FacetRow::new(FacetKind::Tag, "kw")]);
        keyword.keyword = true;
        keyword.rows[0].checked = true;
        groups.push(keyword);

        let unchecked = uncheck_all(&mut groups);
        assert_eq!(unchecked, vec![FacetValue::new("smoke"), FacetValue::new("kw")]);
        assert!(groups.iter().flat_map(|g| &g.rows).all(|r| !r.checked));
    }
}
