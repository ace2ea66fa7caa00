use std::{collections::HashSet, fmt};

use serde::{Deserialize, Serialize};

use crate::error::ProtocolError;

pub const PLACEHOLDER_PHOTO: &str = "assets/images/placeholder.jpg";

macro_rules! text_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }
    };
}

// Candidates are identified by name; the scoring service has no other key.
text_newtype!(CandidateId);
text_newtype!(SessionToken);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    #[serde(rename = "nama")]
    pub name: CandidateId,
    #[serde(rename = "sekolah", default)]
    pub school: String,
    #[serde(rename = "kapanewon", default)]
    pub region: String,
    #[serde(rename = "fotoUrl", default, skip_serializing_if = "Option::is_none")]
    pub photo_url: Option<String>,
}

impl Candidate {
    pub fn id(&self) -> &CandidateId {
        &self.name
    }

    pub fn photo_or_placeholder(&self) -> &str {
        match self.photo_url.as_deref() {
            Some(url) if !url.trim().is_empty() => url,
            _ => PLACEHOLDER_PHOTO,
        }
    }
}

/// Candidates offered on one ballot, in the order the service listed them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Candidate>", into = "Vec<Candidate>")]
pub struct CandidateSet {
    candidates: Vec<Candidate>,
}

impl CandidateSet {
    pub fn new(candidates: Vec<Candidate>) -> Result<Self, ProtocolError> {
        let mut seen = HashSet::with_capacity(candidates.len());
        for candidate in &candidates {
            if !seen.insert(candidate.name.as_str()) {
                return Err(ProtocolError::DuplicateCandidate(candidate.name.0.clone()));
            }
        }
        Ok(Self { candidates })
    }

    pub fn get(&self, id: &CandidateId) -> Option<&Candidate> {
        self.candidates.iter().find(|candidate| &candidate.name == id)
    }

    pub fn contains(&self, id: &CandidateId) -> bool {
        self.get(id).is_some()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Candidate> {
        self.candidates.iter()
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }
}

impl TryFrom<Vec<Candidate>> for CandidateSet {
    type Error = ProtocolError;

    fn try_from(value: Vec<Candidate>) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<CandidateSet> for Vec<Candidate> {
    fn from(value: CandidateSet) -> Self {
        value.candidates
    }
}

impl<'a> IntoIterator for &'a CandidateSet {
    type Item = &'a Candidate;
    type IntoIter = std::slice::Iter<'a, Candidate>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessKind {
    Admin,
    Public,
}
