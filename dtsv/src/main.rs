use std::{fs, path::Path};

use anyhow::{bail, Context, Result};
use dts_core::{
    export_subtree, load_bindings, parse, serialize, Classifier, CrossRefIndex, NodeId, Tree,
};

const USAGE: &str = "\
usage:
  dtsv tree FILE                       print the node hierarchy
  dtsv fmt FILE                        print the canonical serialization
  dtsv export FILE PATH                export the subtree at node PATH
  dtsv users FILE PATH [BINDINGS_DIR]  print nodes referencing node PATH";

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let Some((command, rest)) = args.split_first() else {
        bail!("{USAGE}");
    };

    match (command.as_str(), rest) {
        ("tree", [file]) => {
            let tree = load(file)?;
            print_hierarchy(&tree, tree.root(), 0);
        }
        ("fmt", [file]) => {
            let tree = load(file)?;
            print!("{}", serialize(&tree));
        }
        ("export", [file, path]) => {
            let tree = load(file)?;
            let node = lookup(&tree, path)?;
            print!("{}", export_subtree(&tree, node));
        }
        ("users", [file, path, bindings @ ..]) => {
            let tree = load(file)?;
            let node = lookup(&tree, path)?;

            let classifier = match bindings {
                [] => Classifier::new(),
                [dir] => {
                    let index = load_bindings(Path::new(dir))
                        .with_context(|| format!("loading bindings from {dir}"))?;
                    Classifier::with_bindings(index)
                }
                _ => bail!("{USAGE}"),
            };

            let index = CrossRefIndex::build(&tree);
            for user in index.users_of(&tree, &classifier, node) {
                println!("{}", tree.path(user));
            }
        }
        _ => bail!("{USAGE}"),
    }

    Ok(())
}

fn load(file: &str) -> Result<Tree> {
    let source = fs::read_to_string(file).with_context(|| format!("reading {file}"))?;
    Ok(parse(&source))
}

fn lookup(tree: &Tree, path: &str) -> Result<NodeId> {
    tree.find_by_path(path)
        .with_context(|| format!("no node at path {path}"))
}

fn print_hierarchy(tree: &Tree, node: NodeId, depth: usize) {
    println!("{}{}", "  ".repeat(depth), tree.name(node));
    for &child in tree.children(node) {
        print_hierarchy(tree, child, depth + 1);
    }
}
