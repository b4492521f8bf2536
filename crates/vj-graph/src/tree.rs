use std::fmt::Write;

use vj_core::FrameSignal;

use crate::Node;

/// Box-drawing dump of the graph as it is currently wired.
///
/// Switching nodes only expose their active branch, so this shows what would render right now.
pub fn print_tree<C, R>(root: &dyn Node<C, R>) -> String {
    let mut out = String::new();
    write_node(root, "", true, &mut out);
    out
}

fn write_node<C, R>(node: &dyn Node<C, R>, indent: &str, is_last: bool, out: &mut String) {
    let connector = if is_last { "└── " } else { "├── " };
    let _ = writeln!(out, "{indent}{connector}{}", node.describe());

    let child_indent = format!("{indent}{}", if is_last { "    " } else { "│   " });
    let inputs = node.inputs();
    let n = inputs.len();
    for (i, input) in inputs.into_iter().enumerate() {
        write_node(input.as_ref(), &child_indent, i + 1 == n, out);
    }
}

/// Consistent status label for `describe` implementations.
///
/// `format_node_status("Bloom", Some(FrameSignal::FreqLow), &[("radius", 4.0)])`
/// → `Bloom [freq_low, radius:4.00]`
pub fn format_node_status(name: &str, signal: Option<FrameSignal>, props: &[(&str, f32)]) -> String {
    let mut parts: Vec<String> = Vec::with_capacity(props.len() + 1);
    if let Some(sig) = signal {
        parts.push(sig.name().to_string());
    }
    for (key, value) in props {
        parts.push(format!("{key}:{value:.2}"));
    }
    if parts.is_empty() {
        name.to_string()
    } else {
        format!("{name} [{}]", parts.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Add, Constant, Journal};

    #[test]
    fn status_formats_signal_and_props() {
        assert_eq!(
            format_node_status("Bloom", Some(FrameSignal::FreqLow), &[("radius", 4.0)]),
            "Bloom [freq_low, radius:4.00]"
        );
        assert_eq!(format_node_status("Black", None, &[]), "Black");
    }

    #[test]
    fn tree_lists_inputs_in_order() {
        let add = Add {
            children: vec![Constant::boxed("a", 1.0), Constant::boxed("b", 2.0)],
        };
        let tree = print_tree::<Journal, f32>(&add);
        assert_eq!(
            tree,
            "└── Add\n    ├── Constant(a)\n    └── Constant(b)\n"
        );
    }
}
