//! In-memory MARC21 record: leader plus tagged control and data fields.
//!
//! Decoding from ISO 2709 bytes lives in `nzn-io`; this module only holds
//! the shape the extractor reads.

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarcRecord {
    /// The 24-character leader.
    pub leader: String,
    pub fields: Vec<MarcField>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarcField {
    pub tag: String,
    pub content: FieldContent,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldContent {
    /// Tags 001-009: a single unstructured value.
    Control(String),
    /// Tags 010+: two indicators and coded subfields.
    Data {
        indicators: [char; 2],
        subfields: Vec<Subfield>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subfield {
    pub code: char,
    pub value: String,
}

impl MarcRecord {
    pub fn new(leader: impl Into<String>) -> Self {
        Self {
            leader: leader.into(),
            fields: Vec::new(),
        }
    }

    /// Leader/06.
    pub fn record_type(&self) -> Option<char> {
        self.leader.chars().nth(6)
    }

    /// Leader/07.
    pub fn bib_level(&self) -> Option<char> {
        self.leader.chars().nth(7)
    }

    pub fn fields<'a>(&'a self, tag: &'a str) -> impl Iterator<Item = &'a MarcField> + 'a {
        self.fields.iter().filter(move |f| f.tag == tag)
    }

    /// Value of the last control field with this tag.
    pub fn control_field(&self, tag: &str) -> Option<&str> {
        self.fields
            .iter()
            .filter(|f| f.tag == tag)
            .filter_map(MarcField::control_value)
            .last()
    }

    pub fn push_control(&mut self, tag: &str, value: impl Into<String>) -> &mut Self {
        self.fields.push(MarcField {
            tag: tag.to_string(),
            content: FieldContent::Control(value.into()),
        });
        self
    }

    pub fn push_data(&mut self, tag: &str, indicators: [char; 2], subfields: &[(char, &str)]) -> &mut Self {
        self.fields.push(MarcField {
            tag: tag.to_string(),
            content: FieldContent::Data {
                indicators,
                subfields: subfields
                    .iter()
                    .map(|(code, value)| Subfield {
                        code: *code,
                        value: value.to_string(),
                    })
                    .collect(),
            },
        });
        self
    }
}

impl MarcField {
    pub fn is_control_tag(tag: &str) -> bool {
        tag.len() == 3 && tag.starts_with("00")
    }

    pub fn control_value(&self) -> Option<&str> {
        match &self.content {
            FieldContent::Control(value) => Some(value),
            FieldContent::Data { .. } => None,
        }
    }

    pub fn subfields(&self) -> &[Subfield] {
        match &self.content {
            FieldContent::Data { subfields, .. } => subfields,
            FieldContent::Control(_) => &[],
        }
    }

    /// Values of every subfield with `code`, in field order.
    pub fn subfield_values(&self, code: char) -> impl Iterator<Item = &str> + '_ {
        self.subfields()
            .iter()
            .filter(move |s| s.code == code)
            .map(|s| s.value.as_str())
    }

    pub fn first_subfield(&self, code: char) -> Option<&str> {
        self.subfield_values(code).next()
    }

    /// All subfield values joined by a space (or the control value).
    pub fn text(&self) -> String {
        match &self.content {
            FieldContent::Control(value) => value.clone(),
            FieldContent::Data { subfields, .. } => subfields
                .iter()
                .map(|s| s.value.trim())
                .filter(|v| !v.is_empty())
                .collect::<Vec<_>>()
                .join(" "),
        }
    }
}
