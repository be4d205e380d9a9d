//! Witness policies: a line based description of the witnesses a log trusts
//! and of the groups that must cosign a checkpoint.
//!
//! ```text
//! # Declarations may only refer to names declared above them.
//! witness w1 sigsum.org+e4ade967+AZuUY6B08pW3QVHu8uvsrxWPcAv9nykap2Nb4oxCee+r https://sigsum.org/witness/
//! witness w2 example.com+3753d3de+AebBhMcghIUoavZpjuDofa4sW6fYHyVn7gvwDBfvkvuM https://example.com/witness/
//! group g1 any w1 w2
//! quorum g1
//! ```
//!
//! A group threshold is `all`, `any` or a number of members. `quorum none`
//! selects the empty group, which every checkpoint satisfies.
use crate::errors::{Error, Result};
use crate::witness::{Component, Witness, WitnessGroup};
use std::collections::{HashMap, HashSet};
use tracing::debug;
use url::Url;

const KEYWORD_ALL: &str = "all";
const KEYWORD_ANY: &str = "any";
const KEYWORD_NONE: &str = "none";

fn is_reserved(name: &str) -> bool {
    matches!(name, KEYWORD_ALL | KEYWORD_ANY | KEYWORD_NONE)
}

/// Compile a witness policy into the group selected by its `quorum` line.
///
/// A quorum naming a single witness yields a group requiring that witness.
///
/// # Errors
/// The function fails on the first malformed line, naming it, or if no
/// quorum is selected.
///
/// # Example
/// ```
/// let policy = "
/// witness w1 sigsum.org+e4ade967+AZuUY6B08pW3QVHu8uvsrxWPcAv9nykap2Nb4oxCee+r https://sigsum.org/witness/
/// witness w2 example.com+3753d3de+AebBhMcghIUoavZpjuDofa4sW6fYHyVn7gvwDBfvkvuM https://example.com/witness/
/// group g1 all w1 w2
/// quorum g1
/// ";
/// let group = tlog_witness::policy::parse(policy).unwrap();
/// assert_eq!(group.n(), 2);
/// assert_eq!(group.endpoints().len(), 2);
/// ```
pub fn parse(policy: &str) -> Result<WitnessGroup> {
    let mut components: HashMap<&str, Component> = HashMap::new();
    let mut quorum: Option<WitnessGroup> = None;

    for (i, line) in policy.lines().enumerate() {
        let line_no = i + 1;
        let content = line.split('#').next().unwrap_or_default();
        let tokens: Vec<&str> = content.split_whitespace().collect();
        let Some((&keyword, args)) = tokens.split_first() else {
            continue;
        };

        match keyword {
            "witness" => {
                let (name, witness) = parse_witness(line_no, args)?;
                declare(&mut components, line_no, name, witness.into())?;
            }
            "group" => {
                let (name, group) = parse_group(line_no, args, &components)?;
                declare(&mut components, line_no, name, group.into())?;
            }
            "quorum" => {
                let [name] = args else {
                    return Err(Error::InvalidDefinition {
                        line: line_no,
                        keyword: "quorum",
                        reason: "expected a single component name",
                    });
                };
                if quorum.is_some() {
                    return Err(Error::DuplicateQuorum { line: line_no });
                }
                quorum = Some(match (*name, components.get(name)) {
                    (KEYWORD_NONE, _) => WitnessGroup::default(),
                    (_, Some(Component::Group(g))) => g.clone(),
                    (_, Some(Component::Witness(w))) => {
                        WitnessGroup::new(1, vec![w.clone().into()])?
                    }
                    (_, None) => {
                        return Err(Error::QuorumNotFound {
                            line: line_no,
                            name: name.to_string(),
                        })
                    }
                });
            }
            keyword => {
                return Err(Error::UnknownKeyword {
                    line: line_no,
                    keyword: keyword.to_owned(),
                })
            }
        }
    }

    let quorum = quorum.ok_or(Error::MissingQuorum)?;
    debug!(
        components = components.len(),
        n = quorum.n(),
        "compiled witness policy"
    );
    Ok(quorum)
}

impl WitnessGroup {
    /// Compile a witness policy, see [`parse`].
    pub fn from_policy(policy: &str) -> Result<Self> {
        parse(policy)
    }
}

/// Bind `name` to a newly declared component.
fn declare<'a>(
    components: &mut HashMap<&'a str, Component>,
    line: usize,
    name: &'a str,
    component: Component,
) -> Result<()> {
    if components.contains_key(name) {
        return Err(Error::DuplicateComponent {
            line,
            name: name.to_owned(),
        });
    }
    components.insert(name, component);
    Ok(())
}

/// `witness <name> <verifier key> <url>`
fn parse_witness<'a>(line: usize, args: &[&'a str]) -> Result<(&'a str, Witness)> {
    let &[name, vkey, url] = args else {
        return Err(Error::InvalidDefinition {
            line,
            keyword: "witness",
            reason: "expected a name, a verifier key and a URL",
        });
    };
    if is_reserved(name) {
        return Err(Error::InvalidWitnessName {
            line,
            name: name.to_owned(),
        });
    }

    let invalid = |source: Error| Error::InvalidWitness {
        line,
        name: name.to_owned(),
        source: Box::new(source),
    };
    let url = Url::parse(url).map_err(|e| invalid(e.into()))?;
    let witness = Witness::new(vkey, &url).map_err(invalid)?;
    Ok((name, witness))
}

/// `group <name> <threshold> <member>...`
fn parse_group<'a>(
    line: usize,
    args: &[&'a str],
    components: &HashMap<&str, Component>,
) -> Result<(&'a str, WitnessGroup)> {
    let [name, threshold, members @ ..] = args else {
        return Err(Error::InvalidDefinition {
            line,
            keyword: "group",
            reason: "expected a name, a threshold and at least one member",
        });
    };
    if members.is_empty() {
        return Err(Error::InvalidDefinition {
            line,
            keyword: "group",
            reason: "expected a name, a threshold and at least one member",
        });
    }
    if is_reserved(name) {
        return Err(Error::InvalidGroupName {
            line,
            name: name.to_string(),
        });
    }

    let mut seen = HashSet::new();
    let mut children = Vec::with_capacity(members.len());
    for &member in members {
        if !seen.insert(member) {
            return Err(Error::DuplicateMember {
                line,
                name: member.to_owned(),
            });
        }
        let component = components
            .get(member)
            .ok_or_else(|| Error::UnknownComponent {
                line,
                name: member.to_owned(),
            })?;
        children.push(component.clone());
    }

    let invalid_threshold = || Error::InvalidGroupThreshold {
        line,
        threshold: threshold.to_string(),
        members: members.len(),
    };
    let n = match *threshold {
        KEYWORD_ALL => members.len(),
        KEYWORD_ANY => 1,
        t if !t.is_empty() && t.bytes().all(|b| b.is_ascii_digit()) => {
            t.parse().map_err(|_| invalid_threshold())?
        }
        _ => return Err(invalid_threshold()),
    };
    let group = WitnessGroup::new(n, children).map_err(|_| invalid_threshold())?;
    Ok((*name, group))
}

#[cfg(test)]
mod test {
    use super::*;

    const W1: &str = "witness w1 sigsum.org+e4ade967+AZuUY6B08pW3QVHu8uvsrxWPcAv9nykap2Nb4oxCee+r https://sigsum.org/witness/";
    const W2: &str = "witness w2 example.com+3753d3de+AebBhMcghIUoavZpjuDofa4sW6fYHyVn7gvwDBfvkvuM https://example.com/witness/";
    const W3: &str = "witness w3 example.com+3753d3de+AebBhMcghIUoavZpjuDofa4sW6fYHyVn7gvwDBfvkvuM https://example.com/witness/";

    fn policy(lines: &[&str]) -> String {
        lines.join("\n")
    }

    #[test]
    fn tidy_and_untidy() {
        let tidy = format!("\n{W1}\n{W2}\ngroup g1 all w1 w2\nquorum g1\n");
        let untidy = "

# comment
witness   w1      sigsum.org+e4ade967+AZuUY6B08pW3QVHu8uvsrxWPcAv9nykap2Nb4oxCee+r     https://sigsum.org/witness/    #comment
  witness w2            example.com+3753d3de+AebBhMcghIUoavZpjuDofa4sW6fYHyVn7gvwDBfvkvuM    https://example.com/witness/


\t\t\t     #comment
group      g1    all     w1  w2

\t\t quorum      g1
";
        for p in [tidy.as_str(), untidy] {
            let g = parse(p).unwrap();
            assert_eq!(g.n(), 2);
            assert_eq!(g.components().len(), 2);
        }
    }

    #[test]
    fn thresholds() {
        for (group, want) in [
            ("group g1 2 w1 w2 w3", 2),
            ("group g1 all w1 w2 w3", 3),
            ("group g1 any w1", 1),
            ("group g1 0 w1 w2", 0),
        ] {
            let g = parse(&policy(&[W1, W2, W3, group, "quorum g1"])).unwrap();
            assert_eq!(g.n(), want, "{group}");
        }
    }

    #[test]
    fn endpoints_from_policy() {
        let g = WitnessGroup::from_policy(&policy(&[W1, W2, W3, "group g1 any w1 w2 w3", "quorum g1"]))
            .unwrap();
        let urls: Vec<String> = g.endpoints().keys().map(|u| u.to_string()).collect();
        assert_eq!(
            urls,
            [
                "https://example.com/witness/add-checkpoint",
                "https://sigsum.org/witness/add-checkpoint"
            ]
        );
    }

    #[test]
    fn quorum_on_witness() {
        let g = parse(&policy(&[W1, "quorum w1"])).unwrap();
        assert_eq!(g.n(), 1);
        assert!(matches!(g.components(), [Component::Witness(_)]));
    }

    #[test]
    fn quorum_none() {
        let g = parse(&policy(&[W1, "quorum none"])).unwrap();
        assert_eq!(g.n(), 0);
        assert!(g.components().is_empty());
        assert!(g.satisfied(b"anything\n"));
    }

    #[test]
    fn nested_groups() {
        let g = parse(&policy(&[
            W1,
            W2,
            W3,
            "group inner any w2 w3",
            "group outer all w1 inner",
            "quorum outer",
        ]))
        .unwrap();
        assert_eq!(g.n(), 2);
        assert!(matches!(
            g.components(),
            [Component::Witness(_), Component::Group(inner)] if inner.n() == 1
        ));
        assert_eq!(g.endpoints().len(), 2);
    }

    #[test]
    fn errors() {
        let duplicate = policy(&[W1, W1, "quorum w1"]);
        let negative = policy(&[W1, W2, W3, "group g1 -1 w1", "quorum g1"]);
        let too_high = policy(&[W1, "group g1 2 w1", "quorum g1"]);
        let two_quorums = policy(&[W1, "quorum w1", "quorum w1"]);
        let unknown_member = policy(&[W1, "group g1 any w1 w2", "quorum g1"]);
        let repeated_member = policy(&[W1, "group g1 any w1 w1", "quorum g1"]);
        let forward_ref = policy(&["group g1 any w1", W1, "quorum g1"]);
        let group_dup = policy(&[W1, "group w1 any w1", "quorum w1"]);
        for (p, want) in [
            (W1, "policy file must define a quorum"),
            ("", "policy file must define a quorum"),
            ("quorum unknown", "quorum component \"unknown\" not found"),
            (duplicate.as_str(), "duplicate component name"),
            (group_dup.as_str(), "duplicate component name"),
            (negative.as_str(), "invalid threshold"),
            (too_high.as_str(), "invalid threshold"),
            ("witness all sigsum.org+e4ade967+AZuUY6B08pW3QVHu8uvsrxWPcAv9nykap2Nb4oxCee+r https://sigsum.org/witness/", "invalid witness name"),
            ("group none 1 witness", "invalid group name"),
            (two_quorums.as_str(), "exactly one quorum"),
            (unknown_member.as_str(), "unknown component \"w2\""),
            (repeated_member.as_str(), "duplicate group member"),
            (forward_ref.as_str(), "unknown component \"w1\""),
            ("witness w1 sigsum.org+e4ade967+AZuUY6B08pW3QVHu8uvsrxWPcAv9nykap2Nb4oxCee+r", "invalid witness definition"),
            ("group g1 any", "invalid group definition"),
            ("quorum", "invalid quorum definition"),
            ("quorum a b", "invalid quorum definition"),
            ("witnesses w1", "unknown keyword"),
        ] {
            let err = parse(p).unwrap_err();
            assert!(err.to_string().contains(want), "{p:?}: {err}");
        }
    }

    #[test]
    fn errors_name_the_line() {
        let err = parse(&policy(&["# header", W1, "", "group g1 3 w1", "quorum g1"])).unwrap_err();
        assert!(matches!(err, Error::InvalidGroupThreshold { line: 4, .. }), "{err}");
    }

    #[test]
    fn invalid_witness() {
        let bad_key = "witness w1 sigsum.org+00000000+AZuUY6B08pW3QVHu8uvsrxWPcAv9nykap2Nb4oxCee+r https://sigsum.org/witness/";
        let bad_url = "witness w1 sigsum.org+e4ade967+AZuUY6B08pW3QVHu8uvsrxWPcAv9nykap2Nb4oxCee+r not-a-url";
        for p in [bad_key, bad_url] {
            assert!(matches!(
                parse(p),
                Err(Error::InvalidWitness { line: 1, .. })
            ));
        }
    }
}
