use crate::errors::EngineError;
use std::collections::HashMap;
use std::fmt;

/// How the user declares the state labels.
#[derive(Debug, Clone, PartialEq)]
pub enum SymbolSpec {
    /// A bare state count: labels are the decimal indices.
    Count(usize),
    /// An ordered label array; the reverse index is derived.
    Names(Vec<String>),
    /// An explicit label-to-index mapping.
    Map(HashMap<String, usize>),
}

/// The resolved two-way mapping between user labels and internal indices.
#[derive(Debug, Clone, PartialEq)]
pub struct Symbols {
    names: Vec<String>,
    index: HashMap<String, usize>,
}

impl Symbols {
    /// The identity labeling `"0" .. "K-1"`.
    pub fn identity(states: usize) -> Self {
        let names: Vec<String> = (0..states).map(|i| i.to_string()).collect();
        let index = names
            .iter()
            .enumerate()
            .map(|(i, n)| (n.clone(), i))
            .collect();
        Self { names, index }
    }

    /// Resolves the user declaration against the state count, defaulting to
    /// the identity labeling when absent.
    pub fn resolve(spec: Option<&SymbolSpec>, states: usize) -> Result<Self, EngineError> {
        match spec {
            None => Ok(Self::identity(states)),
            Some(SymbolSpec::Count(k)) => {
                if *k != states {
                    return Err(EngineError::Config(format!(
                        "symbol count {} disagrees with {} states",
                        k, states
                    )));
                }
                Ok(Self::identity(states))
            }
            Some(SymbolSpec::Names(names)) => {
                if names.len() != states {
                    return Err(EngineError::Config(format!(
                        "{} symbols for {} states",
                        names.len(),
                        states
                    )));
                }
                let index = names
                    .iter()
                    .enumerate()
                    .map(|(i, n)| (n.clone(), i))
                    .collect();
                Ok(Self {
                    names: names.clone(),
                    index,
                })
            }
            Some(SymbolSpec::Map(map)) => {
                if map.len() != states {
                    return Err(EngineError::Config(format!(
                        "{} symbols for {} states",
                        map.len(),
                        states
                    )));
                }
                let mut names = vec![String::new(); states];
                for (name, &idx) in map {
                    if idx >= states {
                        return Err(EngineError::Config(format!(
                            "symbol `{}` maps to index {} out of {} states",
                            name, idx, states
                        )));
                    }
                    names[idx] = name.clone();
                }
                Ok(Self {
                    names,
                    index: map.clone(),
                })
            }
        }
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Internal index of the provided label, if declared.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    /// Label of the provided internal index.
    pub fn name_of(&self, index: usize) -> Option<&str> {
        self.names.get(index).map(|s| s.as_str())
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }
}

impl fmt::Display for Symbols {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "[{}]", self.names.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_round_trip() {
        let syms = Symbols::identity(3);
        assert_eq!(syms.index_of("2"), Some(2));
        assert_eq!(syms.name_of(0), Some("0"));
    }

    #[test]
    fn array_reverse_index() {
        let spec = SymbolSpec::Names(vec!["up".to_string(), "down".to_string()]);
        let syms = Symbols::resolve(Some(&spec), 2).unwrap();
        assert_eq!(syms.index_of("down"), Some(1));
        assert!(syms.index_of("sideways").is_none());
    }

    #[test]
    fn count_must_agree() {
        let spec = SymbolSpec::Count(4);
        assert!(Symbols::resolve(Some(&spec), 3).is_err());
    }
}
