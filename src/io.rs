//! Reading trees from Newick and BEAST/NEXUS text, writing distance matrices.
//!
//! Text is parsed with `phylotree` and converted into the arena [`Tree`].
//! Every tree read in one call lands on one taxon namespace.

use std::collections::{BTreeSet, HashMap};
use std::fs::File;
use std::io::{self, BufWriter, Read, Write};
use std::path::Path;
use std::rc::Rc;

use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use phylotree::tree::Tree as PhyloTree;
use tracing::{debug, info, warn};

use crate::error::{PhyloError, Result};
use crate::node::NodeData;
use crate::taxon::{NamespaceRef, TaxonNamespace};
use crate::tree::Tree;
use crate::tree_list::TreeList;

fn parse_error(err: impl std::fmt::Display) -> PhyloError {
    PhyloError::Parse(err.to_string())
}

/// Parses one Newick tree onto `namespace`.
///
/// Named leaves become taxa through `require_taxon`; names of internal nodes
/// become node labels. The tree counts as rooted when its root has exactly
/// two children.
pub fn parse_newick(text: &str, namespace: &NamespaceRef) -> Result<Tree> {
    let phylo = PhyloTree::from_newick(text.trim()).map_err(parse_error)?;
    from_phylotree(&phylo, namespace)
}

/// Copies a `phylotree` tree into the arena, keeping child order.
pub fn from_phylotree(phylo: &PhyloTree, namespace: &NamespaceRef) -> Result<Tree> {
    let mut tree = Tree::new(Rc::clone(namespace));
    tree.set_rooted(phylo.is_rooted().map_err(parse_error)?);

    let root_id = phylo.get_root().map_err(parse_error)?;
    let root = phylo.get(&root_id).map_err(parse_error)?;
    let seed = tree.seed_node();
    if root.children.is_empty() {
        let taxon = root.name.as_deref().map(|name| tree.require_taxon(name));
        tree[seed].set_taxon(taxon);
    } else {
        tree[seed].set_label(root.name.clone());
    }
    let seed_edge = tree[seed].edge();
    tree.set_edge_length(seed_edge, root.parent_edge);

    let mut stack = vec![(root_id, seed)];
    while let Some((phylo_id, node)) = stack.pop() {
        let children = phylo.get(&phylo_id).map_err(parse_error)?.children.clone();
        for child_id in children {
            let child = phylo.get(&child_id).map_err(parse_error)?;
            let mut data = NodeData { edge_length: child.parent_edge, ..Default::default() };
            if child.children.is_empty() {
                data.taxon = child.name.as_deref().map(|name| tree.require_taxon(name));
            } else {
                data.label = child.name.clone();
            }
            let created = tree.new_child(node, data);
            stack.push((child_id, created));
        }
    }
    Ok(tree)
}

/// Reads a whole file, gunzipping it when the path ends in `.gz`.
fn read_text(path: &Path) -> Result<String> {
    let mut text = String::new();
    if path.to_string_lossy().ends_with(".gz") {
        GzDecoder::new(File::open(path)?).read_to_string(&mut text)?;
    } else {
        File::open(path)?.read_to_string(&mut text)?;
    }
    Ok(text)
}

/// Reads a file of `;`-terminated Newick trees onto a fresh namespace.
pub fn read_newick_file<P: AsRef<Path>>(path: P) -> Result<TreeList> {
    let text = read_text(path.as_ref())?;
    let mut list = TreeList::new(TaxonNamespace::new().into_shared());
    for chunk in text.split_inclusive(';').map(str::trim).filter(|c| c.ends_with(';')) {
        let tree = parse_newick(chunk, list.namespace())?;
        list.push(tree)?;
    }
    debug!(path = %path.as_ref().display(), trees = list.len(), "read newick file");
    Ok(list)
}

/// Strip BEAST annotations from Newick strings.
///
/// BEAST format includes annotations like :[&rate=0.123]2.45 where 2.45 is the actual branch length.
/// This function removes the [&...] annotations while preserving the branch lengths.
fn strip_beast_annotations(newick: &str) -> String {
    let mut result = String::with_capacity(newick.len());
    let mut in_annotation = false;
    let mut chars = newick.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '[' && chars.peek() == Some(&'&') {
            in_annotation = true;
        } else if ch == ']' && in_annotation {
            in_annotation = false;
        } else if !in_annotation {
            result.push(ch);
        }
    }

    result
}

/// Trees read from BEAST files, with one generated name per tree.
#[derive(Debug)]
pub struct NamedTrees {
    pub names: Vec<String>,
    pub trees: TreeList,
}

/// Reads a BEAST `.trees` (NEXUS) file onto a fresh namespace.
///
/// See [`read_beast_trees_into`] for burn-in and naming.
pub fn read_beast_trees<P: AsRef<Path>>(
    path: P,
    burnin_trees: usize,
    burnin_states: usize,
    use_real_taxa: bool,
) -> Result<NamedTrees> {
    let mut trees = TreeList::new(TaxonNamespace::new().into_shared());
    let names = read_beast_trees_into(path, burnin_trees, burnin_states, use_real_taxa, &mut trees)?;
    Ok(NamedTrees { names, trees })
}

/// Reads a BEAST `.trees` (NEXUS) file and appends its trees to `list`,
/// returning the names given to them (`<file>_tree_STATE<n>`).
///
/// Burn-in drops the first `burnin_trees` trees and/or keeps only trees with
/// a STATE above `burnin_states`; with both at 0 every tree is kept. With
/// `use_real_taxa`, leaf names are mapped through the TRANSLATE block.
/// Taxa new to the namespace are added in alphabetical order before any tree
/// is converted, so bit positions do not depend on tree order. Trees that
/// fail to parse are skipped with a warning.
pub fn read_beast_trees_into<P: AsRef<Path>>(
    path: P,
    burnin_trees: usize,
    burnin_states: usize,
    use_real_taxa: bool,
    list: &mut TreeList,
) -> Result<Vec<String>> {
    let path = path.as_ref();
    let content = read_text(path)?;

    let base_name = path
        .file_name()
        .and_then(|s| s.to_str())
        .map(|s| s.trim_end_matches(".gz").trim_end_matches(".trees"))
        .unwrap_or("unknown");

    let taxons = parse_taxon_block(&content);

    let parsed: Vec<(String, PhyloTree)> = collect_tree_blocks(&content)
        .into_iter()
        .enumerate()
        .map(|(idx, tree)| {
            let state = extract_state(tree.header);
            (idx, tree, state, format!("{base_name}_tree_STATE{state}"))
        })
        .filter(|(idx, _tree, state, _name)| {
            (burnin_trees == 0 && burnin_states == 0)
                || (burnin_trees > 0 && *idx >= burnin_trees)
                || (burnin_states > 0 && *state > burnin_states)
        })
        .filter_map(|(idx, tree, _state, name)| {
            let newick = strip_beast_annotations(&tree.body);
            let mut phylo_tree = match PhyloTree::from_newick(&newick) {
                Ok(t) => t,
                Err(e) => {
                    warn!(path = %path.display(), index = idx, error = %e, "skipping unparsable tree");
                    return None;
                }
            };
            if use_real_taxa {
                rename_leaf_nodes(&mut phylo_tree, &taxons);
            }
            Some((name, phylo_tree))
        })
        .collect();

    let labels: BTreeSet<String> = parsed
        .iter()
        .flat_map(|(_, phylo)| {
            phylo
                .get_leaves()
                .into_iter()
                .filter_map(|id| phylo.get(&id).ok()?.name.clone())
        })
        .collect();
    {
        let mut ns = list.namespace().borrow_mut();
        for label in &labels {
            ns.require_taxon(label);
        }
    }

    let mut names = Vec::with_capacity(parsed.len());
    for (name, phylo) in &parsed {
        let tree = from_phylotree(phylo, list.namespace())?.with_label(name.clone());
        list.push(tree)?;
        names.push(name.clone());
    }
    info!(
        path = %path.display(),
        taxa = labels.len(),
        trees = names.len(),
        "read beast trees"
    );
    Ok(names)
}

fn extract_state(header: &str) -> usize {
    if let Some(start) = header.to_ascii_uppercase().find("STATE_") {
        let digits: String = header[start + "STATE_".len()..]
            .chars()
            .take_while(|c| c.is_ascii_digit())
            .collect();
        if let Ok(num) = digits.parse::<usize>() {
            return num;
        }
    }
    0
}

struct TreeBlock<'a> {
    header: &'a str,
    body: String,
}

fn collect_tree_blocks(content: &str) -> Vec<TreeBlock<'_>> {
    content
        .lines()
        .skip_while(|line| !line.trim_start().to_ascii_uppercase().starts_with("TREE "))
        .take_while(|line| !line.trim().to_ascii_uppercase().starts_with("END;"))
        .filter_map(|line| {
            let mut parts = line.splitn(2, " = ");
            let header = parts.next()?.trim();
            let body = parts.next()?.trim().to_string();
            Some(TreeBlock { header, body })
        })
        .collect()
}

/// TRANSLATE entries, e.g. `1 '1959.M.CD.59.ZR59',`.
fn parse_taxon_block(content: &str) -> HashMap<String, String> {
    content
        .lines()
        .skip_while(|line| !line.trim().to_ascii_uppercase().starts_with("TRANSLATE"))
        .skip(1)
        .take_while(|line| !line.trim().starts_with(';'))
        .filter_map(|line| {
            let line = line.trim().trim_end_matches(',');
            let mut parts = line.split_whitespace();
            let id = parts.next()?.to_string();
            let label = parts.next()?.trim_matches('\'').to_string();
            Some((id, label))
        })
        .collect()
}

/// Maps leaf names through `translate`. Names missing from the table are kept.
fn rename_leaf_nodes(phylo_tree: &mut PhyloTree, translate: &HashMap<String, String>) {
    if translate.is_empty() {
        return;
    }
    for leaf_id in phylo_tree.get_leaves() {
        if let Ok(node) = phylo_tree.get_mut(&leaf_id)
            && let Some(label) = node.name.as_ref().and_then(|n| translate.get(n))
        {
            node.name = Some(label.clone());
        }
    }
}

/// Write a labeled square matrix as TSV to a file or stdout.
/// If `path` ends with `.gz`, the output is gzip-compressed.
/// If `path` equals `-`, the matrix is written to stdout (uncompressed).
pub fn write_matrix_tsv<P: AsRef<Path>, T: std::fmt::Display>(
    path: P,
    names: &[String],
    mat: &[Vec<T>],
) -> io::Result<()> {
    let p = path.as_ref();
    if names.len() != mat.len() {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("{} names for a matrix of {} rows", names.len(), mat.len()),
        ));
    }

    let mut out: Box<dyn Write> = if p.as_os_str() == "-" {
        Box::new(BufWriter::new(io::stdout().lock()))
    } else if p.to_string_lossy().ends_with(".gz") {
        Box::new(BufWriter::new(GzEncoder::new(File::create(p)?, Compression::default())))
    } else {
        Box::new(BufWriter::new(File::create(p)?))
    };
    write_matrix(&mut out, names, mat)?;
    out.flush()?;
    debug!(path = %p.display(), rows = mat.len(), "wrote distance matrix");
    Ok(())
}

fn write_matrix<W: Write, T: std::fmt::Display>(out: &mut W, names: &[String], mat: &[Vec<T>]) -> io::Result<()> {
    // Header row
    for name in names {
        write!(out, "\t{name}")?;
    }
    writeln!(out)?;

    for (name, row) in names.iter().zip(mat) {
        write!(out, "{name}")?;
        for val in row {
            write!(out, "\t{val}")?;
        }
        writeln!(out)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::newick::NewickOptions;

    const BEAST: &str = "#NEXUS

Begin taxa;
\tDimensions ntax=4;
End;

Begin trees;
\tTranslate
\t\t1 'Pan',
\t\t2 'Homo',
\t\t3 'Gorilla',
\t\t4 'Pongo'
\t\t;
tree STATE_0 = ((1:[&rate=0.5]1.0,2:1.0):0.5,(3:1.0,4:1.0):0.5);
tree STATE_1000 = ((1:1.0,3:1.0):0.5,(2:1.0,4:1.0):0.5);
tree STATE_2000 = ((1:1.0,2:1.0):0.5,(3:1.0,4:1.0):0.5);
End;
";

    fn write_temp(name: &str, content: &str) -> std::path::PathBuf {
        let path = std::env::temp_dir().join(format!("phylo_splits_{}_{name}", std::process::id()));
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_parse_newick() {
        let ns = TaxonNamespace::new().into_shared();
        let tree = parse_newick("((A:1,B:2)ab:0.5,C:3)root;", &ns).unwrap();
        assert!(tree.is_rooted());
        assert_eq!(tree[tree.seed_node()].label(), Some("root"));
        assert_eq!(ns.borrow().len(), 3);
        let options = NewickOptions { include_internal_labels: true, ..Default::default() };
        assert_eq!(tree.as_newick_string(&options), "((A:1,B:2)ab:0.5,C:3)root;");
        tree.validate().unwrap();
    }

    #[test]
    fn test_parse_newick_reuses_taxa() {
        let ns = TaxonNamespace::from_labels(["C", "B", "A"]).into_shared();
        let tree = parse_newick("(A,B,C);", &ns).unwrap();
        assert!(!tree.is_rooted());
        let a = tree.find_node_with_taxon_label("A").unwrap();
        assert_eq!(tree[a].taxon().map(|t| t.bit()), Some(2));
        assert_eq!(ns.borrow().len(), 3);
    }

    #[test]
    fn test_parse_error() {
        let ns = TaxonNamespace::new().into_shared();
        assert!(matches!(parse_newick("((A,B);", &ns), Err(PhyloError::Parse(_))));
    }

    #[test]
    fn test_strip_beast_annotations() {
        assert_eq!(
            strip_beast_annotations("(1:[&rate=0.5]1.0,2:[&rate=1]2.0)[&R];"),
            "(1:1.0,2:2.0);"
        );
    }

    #[test]
    fn test_extract_state() {
        assert_eq!(extract_state("tree STATE_1000"), 1000);
        assert_eq!(extract_state("tree unnamed"), 0);
    }

    #[test]
    fn test_read_beast_trees() {
        let path = write_temp("read.trees", BEAST);
        let read = read_beast_trees(&path, 0, 0, true).unwrap();
        assert_eq!(read.names.len(), 3);
        assert!(read.names[1].ends_with("_tree_STATE1000"));

        // Taxa are numbered alphabetically
        let ns = read.trees.namespace().borrow();
        let labels: Vec<&str> = ns.iter().map(|t| t.label()).collect();
        assert_eq!(labels, ["Gorilla", "Homo", "Pan", "Pongo"]);
        drop(ns);

        let first = read.trees.get(0).unwrap();
        assert_eq!(first.edge_length(first.find_node_with_taxon_label("Pan").unwrap()), Some(1.0));
        std::fs::remove_file(path).unwrap();
    }

    #[test]
    fn test_read_beast_burnin() {
        let path = write_temp("burnin.trees", BEAST);
        let by_count = read_beast_trees(&path, 1, 0, false).unwrap();
        assert_eq!(by_count.names.len(), 2);
        let by_state = read_beast_trees(&path, 0, 1000, false).unwrap();
        assert_eq!(by_state.names.len(), 1);
        // Without translation the TRANSLATE keys are the taxon labels
        assert!(by_state.trees.get(0).unwrap().find_node_with_taxon_label("1").is_some());
        std::fs::remove_file(path).unwrap();
    }

    #[test]
    fn test_read_gzipped_beast_trees() {
        let path = std::env::temp_dir().join(format!("phylo_splits_{}_gz.trees.gz", std::process::id()));
        let mut encoder = GzEncoder::new(File::create(&path).unwrap(), Compression::default());
        encoder.write_all(BEAST.as_bytes()).unwrap();
        encoder.finish().unwrap();

        let read = read_beast_trees(&path, 0, 0, true).unwrap();
        assert_eq!(read.trees.len(), 3);
        assert!(read.names[0].starts_with(&format!("phylo_splits_{}_gz_tree", std::process::id())));
        std::fs::remove_file(path).unwrap();
    }

    #[test]
    fn test_read_newick_file() {
        let path = write_temp("file.nwk", "((A,B),(C,D));\n((A,C),(B,D));\n");
        let list = read_newick_file(&path).unwrap();
        assert_eq!(list.len(), 2);
        assert_eq!(list.namespace().borrow().len(), 4);
        std::fs::remove_file(path).unwrap();
    }

    #[test]
    fn test_write_matrix() {
        let names = vec!["t1".to_string(), "t2".to_string()];
        let mut out = Vec::new();
        write_matrix(&mut out, &names, &[vec![0, 2], vec![2, 0]]).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "\tt1\tt2\nt1\t0\t2\nt2\t2\t0\n");
    }

    #[test]
    fn test_write_matrix_rejects_mismatch() {
        let err = write_matrix_tsv("-", &["t1".to_string()], &[vec![0.0], vec![1.0]]).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
    }
}
