use fnv::FnvHashMap;

/// Protein accessions of a FASTA file, in file order
#[derive(Debug, Default, Clone)]
pub struct Fasta {
    order: FnvHashMap<String, usize>,
}

impl Fasta {
    // Parse a string into a fasta database. Sequences are not kept: only the
    // position of each accession is needed to pick between proteins.
    pub fn parse(contents: &str) -> Fasta {
        let mut order = FnvHashMap::default();
        for line in contents.lines() {
            let line = line.trim();
            if let Some(id) = line.strip_prefix('>') {
                let acc = truncate_protein_name(id);
                if acc.is_empty() {
                    continue;
                }
                let next = order.len();
                order.entry(acc.to_string()).or_insert(next);
            }
        }
        Fasta { order }
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// 0-based position of the protein in the FASTA file
    pub fn ordinal(&self, protein: &str) -> Option<usize> {
        self.order.get(truncate_protein_name(protein)).copied()
    }
}

/// Strip the description from a protein name: everything after the first
/// whitespace
pub fn truncate_protein_name(name: &str) -> &str {
    name.split_ascii_whitespace().next().unwrap_or_default()
}
