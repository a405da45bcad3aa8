use super::*;

/// Minimal stand-in for a nested expression tree.
enum Node {
    Leaf(u64),
    Nest(Box<Node>),
}

fn build(depth: u64) -> Node {
    let mut node = Node::Leaf(depth);
    for _ in 0..depth {
        node = Node::Nest(Box::new(node));
    }
    node
}

fn walk(node: &Node) -> u64 {
    ensure_sufficient_stack(|| match node {
        Node::Leaf(n) => *n,
        Node::Nest(inner) => walk(inner),
    })
}

fn nesting(node: &Node) -> u64 {
    ensure_sufficient_stack(|| match node {
        Node::Leaf(_) => 0,
        Node::Nest(inner) => nesting(inner) + 1,
    })
}

fn unwind(node: Node) {
    // Dropping a deep Box chain recursively would overflow on its own.
    let mut current = node;
    while let Node::Nest(inner) = current {
        current = *inner;
    }
}

#[test]
fn test_shallow_tree() {
    let tree = build(3);
    assert_eq!(walk(&tree), 3);
    assert_eq!(nesting(&tree), 3);
    unwind(tree);
}

#[test]
fn test_deep_tree_does_not_overflow() {
    let tree = build(200_000);
    assert_eq!(nesting(&tree), 200_000);
    unwind(tree);
}

#[test]
fn test_result_passes_through() {
    let ok: Result<u8, String> = ensure_sufficient_stack(|| Ok(7));
    assert_eq!(ok, Ok(7));

    let err: Result<u8, String> = ensure_sufficient_stack(|| Err("boom".to_string()));
    assert_eq!(err, Err("boom".to_string()));
}

#[test]
#[cfg(not(target_arch = "wasm32"))]
fn test_remaining_stack_is_reported() {
    let remaining = remaining_stack();
    assert!(remaining.is_some_and(|bytes| bytes > 0));
}
