//! Collated atom model
//!
//! [`AtomDecl`] is the validated, immutable description of one atom. [`Atoms`]
//! is the collation result: every decl ordered by code, plus the signature
//! buckets that drive per-signature code generation.

use crate::annotation::{AnnotationSet, FieldNumberToAnnotations, ATOM_ID_FIELD_NUMBER};
use crate::types::{FieldType, Signature};
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};

/// Primary field number meaning "the first uid of the attribution chain".
pub const FIRST_UID_IN_CHAIN: i32 = 0;

/// Name given to the attribution-chain field of a collapsed non-chained atom.
pub const COLLAPSED_CHAIN_FIELD_NAME: &str = "attribution_chain";

/// One positional field of an atom.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AtomField {
    pub name: String,
    pub ty: FieldType,
    /// Enum value number to symbol, for enum and enum-array fields only.
    pub enum_values: BTreeMap<i32, String>,
}

impl AtomField {
    pub fn new(name: impl Into<String>, ty: FieldType) -> Self {
        Self {
            name: name.into(),
            ty,
            enum_values: BTreeMap::new(),
        }
    }
}

/// Whether an atom is emitted when the event happens or polled on demand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum AtomKind {
    Pushed,
    Pulled,
}

/// One validated atom definition.
///
/// Equality and ordering are by code only.
#[derive(Debug, Clone)]
pub struct AtomDecl {
    pub code: i32,
    pub name: String,
    /// Message type the atom was collated from.
    pub message: String,
    pub doc: String,
    pub fields: Vec<AtomField>,
    pub modules: BTreeSet<String>,
    pub kind: AtomKind,
    pub annotations: FieldNumberToAnnotations,
    pub uid_field: Option<i32>,
    /// Primary state fields; [`FIRST_UID_IN_CHAIN`] stands for the chain's first uid.
    pub primary_fields: Vec<i32>,
    pub exclusive_field: Option<i32>,
    pub default_state: Option<i32>,
    pub trigger_state_reset: Option<i32>,
    pub nested: bool,
    pub binary_fields: Vec<i32>,
    pub truncate_timestamp: bool,
    pub whitelisted: bool,
    /// Legacy shape: a uid field and a tag field standing in for a one-node chain.
    pub non_chained: bool,
}

impl PartialEq for AtomDecl {
    fn eq(&self, other: &Self) -> bool {
        self.code == other.code
    }
}

impl Eq for AtomDecl {}

impl PartialOrd for AtomDecl {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for AtomDecl {
    fn cmp(&self, other: &Self) -> Ordering {
        self.code.cmp(&other.code)
    }
}

impl AtomDecl {
    /// An empty pushed decl, filled in by the collator.
    pub fn new(code: i32, name: impl Into<String>) -> Self {
        Self {
            code,
            name: name.into(),
            message: String::new(),
            doc: String::new(),
            fields: Vec::new(),
            modules: BTreeSet::new(),
            kind: AtomKind::Pushed,
            annotations: FieldNumberToAnnotations::new(),
            uid_field: None,
            primary_fields: Vec::new(),
            exclusive_field: None,
            default_state: None,
            trigger_state_reset: None,
            nested: false,
            binary_fields: Vec::new(),
            truncate_timestamp: false,
            whitelisted: false,
            non_chained: false,
        }
    }

    pub fn signature(&self) -> Signature {
        Signature::from_types(self.fields.iter().map(|f| f.ty))
    }

    pub fn has_attribution_chain(&self) -> bool {
        self.fields
            .iter()
            .any(|f| f.ty == FieldType::AttributionChain)
    }

    pub fn has_field_type(&self, ty: FieldType) -> bool {
        self.fields.iter().any(|f| f.ty == ty)
    }

    /// Whether the atom carries any state-tracking information.
    pub fn is_state_atom(&self) -> bool {
        !self.primary_fields.is_empty() || self.exclusive_field.is_some()
    }

    /// The field at a 1-based field number.
    pub fn field(&self, number: i32) -> Option<&AtomField> {
        let index = usize::try_from(number).ok()?.checked_sub(1)?;
        self.fields.get(index)
    }

    /// Annotations at a field number, if any.
    pub fn annotations_at(&self, number: i32) -> Option<&AnnotationSet> {
        self.annotations.get(&number).filter(|set| !set.is_empty())
    }

    /// The decl as seen by chained call sites.
    ///
    /// For a non-chained atom the two leading fields are replaced with a
    /// single attribution chain, annotations on them are dropped and later
    /// field numbers shift down by one. Other atoms are returned unchanged.
    pub fn chained_view(&self) -> AtomDecl {
        if !self.non_chained {
            return self.clone();
        }

        let shift = |n: i32| if n > 2 { Some(n - 1) } else { None };

        let mut fields = vec![AtomField::new(
            COLLAPSED_CHAIN_FIELD_NAME,
            FieldType::AttributionChain,
        )];
        fields.extend(self.fields.iter().skip(2).cloned());

        let annotations = self
            .annotations
            .iter()
            .filter_map(|(number, set)| {
                let number = if *number == ATOM_ID_FIELD_NUMBER {
                    ATOM_ID_FIELD_NUMBER
                } else {
                    shift(*number)?
                };
                Some((number, set.clone()))
            })
            .collect();

        AtomDecl {
            fields,
            annotations,
            uid_field: None,
            primary_fields: self.primary_fields.iter().filter_map(|n| shift(*n)).collect(),
            exclusive_field: self.exclusive_field.and_then(shift),
            binary_fields: self.binary_fields.iter().filter_map(|n| shift(*n)).collect(),
            non_chained: false,
            ..self.clone()
        }
    }
}

/// Atoms sharing one signature.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SignatureInfo {
    /// Codes of the atoms in the bucket.
    pub atoms: BTreeSet<i32>,
    /// Field number (0 is the atom id) to the codes annotated there and
    /// their annotations.
    pub field_annotations: BTreeMap<i32, BTreeMap<i32, AnnotationSet>>,
}

impl SignatureInfo {
    fn register(&mut self, code: i32, annotations: &FieldNumberToAnnotations) {
        self.atoms.insert(code);
        for (number, set) in annotations {
            if set.is_empty() {
                continue;
            }
            self.field_annotations
                .entry(*number)
                .or_default()
                .insert(code, set.clone());
        }
    }
}

/// Signature buckets in structural order.
pub type SignatureInfoMap = BTreeMap<Signature, SignatureInfo>;

/// The collation result.
#[derive(Debug, Clone, Default)]
pub struct Atoms {
    pub decls: BTreeMap<i32, AtomDecl>,
    /// Buckets for pushed atoms, including the chained view of non-chained atoms.
    pub signatures: SignatureInfoMap,
    pub pulled_signatures: SignatureInfoMap,
    /// Flat signatures of non-chained atoms.
    pub non_chained_signatures: SignatureInfoMap,
    /// Highest pushed atom code, 0 when there are none.
    pub max_pushed_atom_id: i32,
}

impl Atoms {
    /// Build the result and every derived map from a set of decls.
    ///
    /// Decls are keyed by code; a later decl with a code already present
    /// replaces the earlier one, so callers reject duplicates first.
    pub fn from_decls(decls: impl IntoIterator<Item = AtomDecl>) -> Self {
        let decls: BTreeMap<i32, AtomDecl> = decls.into_iter().map(|d| (d.code, d)).collect();

        let mut signatures = SignatureInfoMap::new();
        let mut pulled_signatures = SignatureInfoMap::new();
        let mut non_chained_signatures = SignatureInfoMap::new();
        let mut max_pushed_atom_id = 0;

        for decl in decls.values() {
            let target = match decl.kind {
                AtomKind::Pushed => {
                    max_pushed_atom_id = max_pushed_atom_id.max(decl.code);
                    &mut signatures
                }
                AtomKind::Pulled => &mut pulled_signatures,
            };

            if decl.non_chained {
                non_chained_signatures
                    .entry(decl.signature())
                    .or_default()
                    .register(decl.code, &decl.annotations);
                let chained = decl.chained_view();
                target
                    .entry(chained.signature())
                    .or_default()
                    .register(decl.code, &chained.annotations);
            } else {
                target
                    .entry(decl.signature())
                    .or_default()
                    .register(decl.code, &decl.annotations);
            }
        }

        Self {
            decls,
            signatures,
            pulled_signatures,
            non_chained_signatures,
            max_pushed_atom_id,
        }
    }

    pub fn len(&self) -> usize {
        self.decls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.decls.is_empty()
    }

    pub fn get(&self, code: i32) -> Option<&AtomDecl> {
        self.decls.get(&code)
    }

    /// Decls in code order.
    pub fn iter(&self) -> impl Iterator<Item = &AtomDecl> {
        self.decls.values()
    }

    /// Codes in ascending order.
    pub fn codes(&self) -> Vec<i32> {
        self.decls.keys().copied().collect()
    }
}
