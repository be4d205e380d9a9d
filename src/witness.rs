//! Witnesses and nested M-of-N witness groups.
//!
//! A [`WitnessGroup`] is a tree whose leaves are [`Witness`]es. A group is
//! satisfied by a checkpoint when at least `n` of its direct components are:
//! a witness by carrying a valid cosignature from it, a subgroup by being
//! satisfied itself. A subgroup therefore counts once towards its parent, and
//! a subgroup with threshold zero always counts.
use crate::cosig::CosignatureV1Verifier;
use crate::errors::{Error, Result};
use crate::note::SignedNote;
use crate::traits::Verifier;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, trace};
use url::Url;

/// Path appended to the base URL of a witness to submit a checkpoint, see
/// <https://c2sp.org/tlog-witness>.
const ADD_CHECKPOINT_PATH: &str = "add-checkpoint";

/// Outcome of each witness verification made during one evaluation, keyed by
/// the address of the witness's shared verifier.
///
/// The same witness may sit in several branches of a policy tree; all copies
/// share one verifier, so its signature is checked once per evaluation.
#[derive(Default)]
struct VerificationCache(HashMap<usize, bool>);

impl VerificationCache {
    fn verified(&mut self, witness: &Witness, note: &SignedNote<'_>) -> bool {
        let key = Arc::as_ptr(&witness.verifier) as *const () as usize;
        *self.0.entry(key).or_insert_with(|| {
            let ok = note.verified_by(witness.verifier.as_ref());
            trace!(witness = %witness.verifier.name(), ok, "verified cosignature");
            ok
        })
    }
}

/// A single witness: the key it cosigns with and where to submit checkpoints.
#[derive(Clone)]
pub struct Witness {
    verifier: Arc<dyn Verifier>,
    endpoint: Url,
}

impl Witness {
    /// Construct a witness from its published key and base URL.
    ///
    /// The submission endpoint is `base_url` with `add-checkpoint` appended as
    /// a path segment.
    ///
    /// # Errors
    /// The function fails if `vkey` is not a valid witness key, or if
    /// `base_url` cannot have a path.
    ///
    /// # Example
    /// ```
    /// use tlog_witness::witness::Witness;
    /// use url::Url;
    ///
    /// let base = Url::parse("https://witness.example.com/prefix").unwrap();
    /// let w = Witness::new("Wit1+55ee4561+AVhZSmQj9+SoL+p/nN0Hh76xXmF7QcHfytUrI1XfSClk", &base).unwrap();
    /// assert_eq!(w.endpoint().as_str(), "https://witness.example.com/prefix/add-checkpoint");
    /// ```
    pub fn new(vkey: &str, base_url: &Url) -> Result<Self> {
        let verifier = CosignatureV1Verifier::new(vkey)?;
        Self::with_verifier(Arc::new(verifier), base_url)
    }

    /// Construct a witness from an existing verifier.
    pub fn with_verifier(verifier: Arc<dyn Verifier>, base_url: &Url) -> Result<Self> {
        let mut endpoint = base_url.clone();
        endpoint
            .path_segments_mut()
            .map_err(|_| Error::Url(format!("{base_url} cannot be a base")))?
            .pop_if_empty()
            .push(ADD_CHECKPOINT_PATH);
        Ok(Self { verifier, endpoint })
    }

    /// Verifier of the witness's cosignatures.
    pub fn verifier(&self) -> &Arc<dyn Verifier> {
        &self.verifier
    }

    /// URL checkpoints are submitted to.
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Whether `checkpoint` carries a valid cosignature from this witness.
    pub fn satisfied(&self, checkpoint: &[u8]) -> bool {
        evaluate(checkpoint, |note, cache| self.satisfied_by(note, cache))
    }

    /// Submission endpoint of this witness, with its verifier.
    pub fn endpoints(&self) -> BTreeMap<Url, Arc<dyn Verifier>> {
        let mut out = BTreeMap::new();
        self.collect_endpoints(&mut out);
        out
    }

    fn satisfied_by(&self, note: Option<&SignedNote<'_>>, cache: &mut VerificationCache) -> bool {
        note.is_some_and(|note| cache.verified(self, note))
    }

    fn collect_endpoints(&self, out: &mut BTreeMap<Url, Arc<dyn Verifier>>) {
        out.entry(self.endpoint.clone())
            .or_insert_with(|| self.verifier.clone());
    }
}

impl fmt::Debug for Witness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Witness")
            .field("name", &self.verifier.name())
            .field("key_hash", &format_args!("{:08x}", self.verifier.key_hash()))
            .field("endpoint", &self.endpoint.as_str())
            .finish()
    }
}

/// A member of a [`WitnessGroup`].
#[derive(Debug, Clone)]
pub enum Component {
    /// A single witness.
    Witness(Witness),
    /// A nested group, counting once towards its parent.
    Group(WitnessGroup),
}

impl Component {
    /// Whether `checkpoint` satisfies this component.
    pub fn satisfied(&self, checkpoint: &[u8]) -> bool {
        evaluate(checkpoint, |note, cache| self.satisfied_by(note, cache))
    }

    /// All submission endpoints reachable from this component.
    pub fn endpoints(&self) -> BTreeMap<Url, Arc<dyn Verifier>> {
        let mut out = BTreeMap::new();
        self.collect_endpoints(&mut out);
        out
    }

    fn satisfied_by(&self, note: Option<&SignedNote<'_>>, cache: &mut VerificationCache) -> bool {
        match self {
            Self::Witness(w) => w.satisfied_by(note, cache),
            Self::Group(g) => g.satisfied_by(note, cache),
        }
    }

    fn collect_endpoints(&self, out: &mut BTreeMap<Url, Arc<dyn Verifier>>) {
        match self {
            Self::Witness(w) => w.collect_endpoints(out),
            Self::Group(g) => g.collect_endpoints(out),
        }
    }
}

impl From<Witness> for Component {
    fn from(w: Witness) -> Self {
        Self::Witness(w)
    }
}

impl From<WitnessGroup> for Component {
    fn from(g: WitnessGroup) -> Self {
        Self::Group(g)
    }
}

/// A group of components of which at least `n` must be satisfied.
///
/// The default group has no components and a threshold of zero; it is
/// satisfied by any checkpoint and has no endpoints.
#[derive(Debug, Clone, Default)]
pub struct WitnessGroup {
    n: usize,
    components: Vec<Component>,
}

impl WitnessGroup {
    /// Construct a group requiring `n` of `components`.
    ///
    /// # Errors
    /// The function fails if `n` exceeds the number of components.
    pub fn new(n: usize, components: Vec<Component>) -> Result<Self> {
        if n > components.len() {
            return Err(Error::InvalidThreshold {
                threshold: n.to_string(),
                members: components.len(),
            });
        }
        Ok(Self { n, components })
    }

    /// Number of components that must be satisfied.
    pub fn n(&self) -> usize {
        self.n
    }

    /// Members of the group.
    pub fn components(&self) -> &[Component] {
        &self.components
    }

    /// Whether `checkpoint` carries enough cosignatures to satisfy the group.
    ///
    /// The checkpoint is parsed once and each distinct witness is verified
    /// at most once, however often it appears in the tree. A checkpoint that
    /// cannot be parsed satisfies no witness.
    pub fn satisfied(&self, checkpoint: &[u8]) -> bool {
        evaluate(checkpoint, |note, cache| self.satisfied_by(note, cache))
    }

    /// All submission endpoints reachable from this group, regardless of
    /// thresholds, each with the verifier of the witness behind it.
    pub fn endpoints(&self) -> BTreeMap<Url, Arc<dyn Verifier>> {
        let mut out = BTreeMap::new();
        self.collect_endpoints(&mut out);
        out
    }

    fn satisfied_by(&self, note: Option<&SignedNote<'_>>, cache: &mut VerificationCache) -> bool {
        let mut count = 0;
        for c in &self.components {
            if count >= self.n {
                break;
            }
            if c.satisfied_by(note, cache) {
                count += 1;
            }
        }
        trace!(n = self.n, count, "evaluated witness group");
        count >= self.n
    }

    fn collect_endpoints(&self, out: &mut BTreeMap<Url, Arc<dyn Verifier>>) {
        for c in &self.components {
            c.collect_endpoints(out);
        }
    }
}

/// Parse `checkpoint` once and run `f` with a fresh verification cache.
fn evaluate<F>(checkpoint: &[u8], f: F) -> bool
where
    F: FnOnce(Option<&SignedNote<'_>>, &mut VerificationCache) -> bool,
{
    let note = match SignedNote::parse(checkpoint) {
        Ok(note) => Some(note),
        Err(e) => {
            debug!(error = %e, "checkpoint cannot be parsed");
            None
        }
    };
    f(note.as_ref(), &mut VerificationCache::default())
}
