use std::collections::{BTreeSet, HashMap};
use std::fmt::{Display, Formatter, Result as FmtResult};

/// The vertices of a graph that share one signature string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymmetryClass {
    signature: String,
    vertices: BTreeSet<usize>,
}

impl SymmetryClass {
    pub fn new(signature: impl Into<String>) -> Self {
        Self {
            signature: signature.into(),
            vertices: BTreeSet::new(),
        }
    }

    pub fn signature(&self) -> &str {
        &self.signature
    }

    pub fn has_signature(&self, signature: &str) -> bool {
        self.signature == signature
    }

    pub fn add(&mut self, vertex: usize) {
        self.vertices.insert(vertex);
    }

    pub fn contains(&self, vertex: usize) -> bool {
        self.vertices.contains(&vertex)
    }

    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    /// The member vertices in ascending order.
    pub fn vertices(&self) -> impl Iterator<Item = usize> + '_ {
        self.vertices.iter().copied()
    }
}

impl Display for SymmetryClass {
    fn fmt(&self, f: &mut Formatter) -> FmtResult {
        let members: Vec<String> = self.vertices().map(|v| v.to_string()).collect();
        write!(f, "{} {}", self.signature, members.join(" "))
    }
}

/// Group vertex `i` under `signatures[i]`. Classes come out in the order their first
/// vertex appears.
pub fn group_by_signature<S: AsRef<str>>(signatures: &[S]) -> Vec<SymmetryClass> {
    let mut classes: Vec<SymmetryClass> = Vec::new();
    let mut positions: HashMap<&str, usize> = HashMap::new();
    for (vertex, signature) in signatures.iter().enumerate() {
        let signature = signature.as_ref();
        let position = *positions.entry(signature).or_insert_with(|| {
            classes.push(SymmetryClass::new(signature));
            classes.len() - 1
        });
        classes[position].add(vertex);
    }
    classes
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_group_by_signature() {
        let classes = group_by_signature(&["b", "a", "b", "c", "a"]);
        assert_eq!(classes.len(), 3);
        assert!(classes[0].has_signature("b"));
        assert_eq!(classes[0].vertices().collect::<Vec<_>>(), vec![0, 2]);
        assert_eq!(classes[1].signature(), "a");
        assert_eq!(classes[1].vertices().collect::<Vec<_>>(), vec![1, 4]);
        assert_eq!(classes[2].len(), 1);
        assert!(classes[2].contains(3));
        assert!(!classes[2].contains(0));
    }

    #[test]
    fn test_empty() {
        assert!(group_by_signature::<String>(&[]).is_empty());
        assert!(SymmetryClass::new("[C]").is_empty());
    }

    #[test]
    fn test_display() {
        let mut class = SymmetryClass::new("[.]([.])");
        class.add(3);
        class.add(1);
        assert_eq!(class.to_string(), "[.]([.]) 1 3");
    }
}
