//! Textual candidate-set summaries.
//!
//! A summary file carries one line per field and one block per method:
//!
//! ```text
//! # library seeds
//! field java.lang.System.out READONLY
//! method java.util.List.add(O)Z
//!   this MUTABLE,POLYREAD
//!   param 0 READONLY
//!   return MUTABLE
//!   static READONLY
//! ```
//!
//! Blank lines and `#` comments are skipped. Parsed summaries seed a
//! run's candidate sets before the first round; [`Summary::collect`]
//! turns a finished run's sets back into the same format, so one
//! analysis can feed the next.

use crate::analysis::{CandidateSet, QualifierStore};
use crate::ir::ReferenceGraph;
use crate::Error;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// The seeded surface of one method.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct MethodSummary {
    signature: String,
    this: Option<CandidateSet>,
    parameters: BTreeMap<usize, CandidateSet>,
    return_value: Option<CandidateSet>,
    static_state: Option<CandidateSet>,
}

impl MethodSummary {
    fn new<S: Into<String>>(signature: S) -> MethodSummary {
        MethodSummary {
            signature: signature.into(),
            ..Default::default()
        }
    }

    pub fn signature(&self) -> &str {
        &self.signature
    }

    pub fn this(&self) -> Option<CandidateSet> {
        self.this
    }

    pub fn parameter(&self, position: usize) -> Option<CandidateSet> {
        self.parameters.get(&position).copied()
    }

    pub fn return_value(&self) -> Option<CandidateSet> {
        self.return_value
    }

    pub fn static_state(&self) -> Option<CandidateSet> {
        self.static_state
    }
}

/// A full summary file: field sets keyed by qualified name, method
/// summaries keyed by signature.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct Summary {
    fields: BTreeMap<String, CandidateSet>,
    methods: BTreeMap<String, MethodSummary>,
}

fn parse_set(number: usize, token: Option<&str>) -> Result<CandidateSet, Error> {
    let token =
        token.ok_or_else(|| Error::SummaryParse(number, "missing qualifier set".to_string()))?;
    token
        .parse()
        .map_err(|e: Error| Error::SummaryParse(number, e.to_string()))
}

fn reject_trailing<'a, I: Iterator<Item = &'a str>>(
    number: usize,
    mut tokens: I,
) -> Result<(), Error> {
    match tokens.next() {
        Some(token) => Err(Error::SummaryParse(
            number,
            format!("unexpected trailing token {:?}", token),
        )),
        None => Ok(()),
    }
}

impl Summary {
    pub fn parse(text: &str) -> Result<Summary, Error> {
        let mut summary = Summary::default();
        let mut current: Option<MethodSummary> = None;

        for (index, raw) in text.lines().enumerate() {
            let number = index + 1;
            let line = raw.trim_end();
            if line.trim().is_empty() || line.trim_start().starts_with('#') {
                continue;
            }
            let indented = line.starts_with(' ') || line.starts_with('\t');
            let mut tokens = line.split_whitespace();
            let head = match tokens.next() {
                Some(head) => head,
                None => continue,
            };

            if !indented {
                if let Some(done) = current.take() {
                    summary.methods.insert(done.signature.clone(), done);
                }
                match head {
                    "field" => {
                        let name = tokens.next().ok_or_else(|| {
                            Error::SummaryParse(number, "field line needs a name".to_string())
                        })?;
                        let set = parse_set(number, tokens.next())?;
                        reject_trailing(number, tokens)?;
                        if summary.fields.insert(name.to_string(), set).is_some() {
                            return Err(Error::SummaryParse(
                                number,
                                format!("field {} summarized twice", name),
                            ));
                        }
                    }
                    "method" => {
                        let signature = tokens.next().ok_or_else(|| {
                            Error::SummaryParse(number, "method line needs a signature".to_string())
                        })?;
                        reject_trailing(number, tokens)?;
                        if summary.methods.contains_key(signature) {
                            return Err(Error::SummaryParse(
                                number,
                                format!("method {} summarized twice", signature),
                            ));
                        }
                        current = Some(MethodSummary::new(signature));
                    }
                    other => {
                        return Err(Error::SummaryParse(
                            number,
                            format!("unknown directive {:?}", other),
                        ))
                    }
                }
                continue;
            }

            let method = current.as_mut().ok_or_else(|| {
                Error::SummaryParse(number, "indented line outside a method block".to_string())
            })?;
            match head {
                "this" => {
                    let set = parse_set(number, tokens.next())?;
                    reject_trailing(number, tokens)?;
                    if method.this.replace(set).is_some() {
                        return Err(Error::SummaryParse(number, "this given twice".to_string()));
                    }
                }
                "param" => {
                    let position = tokens
                        .next()
                        .and_then(|token| token.parse::<usize>().ok())
                        .ok_or_else(|| {
                            Error::SummaryParse(
                                number,
                                "param line needs a position".to_string(),
                            )
                        })?;
                    let set = parse_set(number, tokens.next())?;
                    reject_trailing(number, tokens)?;
                    if method.parameters.insert(position, set).is_some() {
                        return Err(Error::SummaryParse(
                            number,
                            format!("param {} given twice", position),
                        ));
                    }
                }
                "return" => {
                    let set = parse_set(number, tokens.next())?;
                    reject_trailing(number, tokens)?;
                    if method.return_value.replace(set).is_some() {
                        return Err(Error::SummaryParse(
                            number,
                            "return given twice".to_string(),
                        ));
                    }
                }
                "static" => {
                    let set = parse_set(number, tokens.next())?;
                    reject_trailing(number, tokens)?;
                    if method.static_state.replace(set).is_some() {
                        return Err(Error::SummaryParse(
                            number,
                            "static given twice".to_string(),
                        ));
                    }
                }
                other => {
                    return Err(Error::SummaryParse(
                        number,
                        format!("unknown method entry {:?}", other),
                    ))
                }
            }
        }

        if let Some(done) = current.take() {
            summary.methods.insert(done.signature.clone(), done);
        }
        Ok(summary)
    }

    pub fn fields(&self) -> &BTreeMap<String, CandidateSet> {
        &self.fields
    }

    pub fn methods(&self) -> impl Iterator<Item = &MethodSummary> {
        self.methods.values()
    }

    pub fn method(&self, signature: &str) -> Option<&MethodSummary> {
        self.methods.get(signature)
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty() && self.methods.is_empty()
    }

    /// Intersect the summarized sets into a store before a run. Entries
    /// that match nothing in the graph are logged and skipped.
    pub fn seed(&self, graph: &ReferenceGraph, store: &mut QualifierStore) {
        for (name, &set) in &self.fields {
            let site = graph
                .sites()
                .find(|site| site.kind().is_field() && site.name() == name)
                .map(|site| site.index());
            match site {
                Some(site) => {
                    store.seed(graph, site, set);
                }
                None => warn!("summary names unknown field {}", name),
            }
        }
        for (signature, summary) in &self.methods {
            let method = match graph.methods().find(|m| m.signature() == signature) {
                Some(method) => method,
                None => {
                    warn!("summary names unknown method {}", signature);
                    continue;
                }
            };
            if let Some(set) = summary.this {
                match method.receiver() {
                    Some(receiver) => {
                        store.seed(graph, receiver, set);
                    }
                    None => warn!("summary gives this for receiverless {}", signature),
                }
            }
            for (&position, &set) in &summary.parameters {
                match method.parameters().get(position) {
                    Some(&parameter) => {
                        store.seed(graph, parameter, set);
                    }
                    None => warn!(
                        "summary gives param {} beyond the arity of {}",
                        position, signature
                    ),
                }
            }
            if let Some(set) = summary.return_value {
                match method.return_value() {
                    Some(return_value) => {
                        store.seed(graph, return_value, set);
                    }
                    None => warn!("summary gives return for void {}", signature),
                }
            }
            if let Some(set) = summary.static_state {
                store.seed(graph, method.index(), set);
            }
        }
        debug!(
            "seeded {} fields and {} methods",
            self.fields.len(),
            self.methods.len()
        );
    }

    /// Capture a finished run's sets for the graph's fields and method
    /// surfaces. Untouched sites report their kind defaults.
    pub fn collect(graph: &ReferenceGraph, store: &QualifierStore) -> Summary {
        let final_set = |site: usize| -> CandidateSet {
            if let Some(set) = store.set(site) {
                return set;
            }
            graph
                .site(site)
                .map(|site| CandidateSet::default_for(site.kind()))
                .unwrap_or_else(|_| CandidateSet::full())
        };

        let mut summary = Summary::default();
        for site in graph.sites() {
            if site.kind().is_field() {
                summary
                    .fields
                    .insert(site.name().to_string(), final_set(site.index()));
            }
        }
        for method in graph.methods() {
            let mut entry = MethodSummary::new(method.signature());
            entry.this = method.receiver().map(&final_set);
            for (position, &parameter) in method.parameters().iter().enumerate() {
                entry.parameters.insert(position, final_set(parameter));
            }
            entry.return_value = method.return_value().map(&final_set);
            entry.static_state = Some(final_set(method.index()));
            summary.methods.insert(entry.signature.clone(), entry);
        }
        summary
    }
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for (name, set) in &self.fields {
            writeln!(f, "field {} {}", name, set)?;
        }
        for (signature, method) in &self.methods {
            writeln!(f, "method {}", signature)?;
            if let Some(set) = method.this {
                writeln!(f, "  this {}", set)?;
            }
            for (position, set) in &method.parameters {
                writeln!(f, "  param {} {}", position, set)?;
            }
            if let Some(set) = method.return_value {
                writeln!(f, "  return {}", set)?;
            }
            if let Some(set) = method.static_state {
                writeln!(f, "  static {}", set)?;
            }
        }
        Ok(())
    }
}
