use serde::ser::SerializeStruct;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use num_rational::BigRational;
use num_traits::{One, Zero};
use rustc_hash::FxHashMap;

use super::{ExprGraph, ExprId, FunctionId, Node, SymbolId, SymbolInfo, SymbolKind};

impl Serialize for ExprGraph {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let symbols: Vec<(&str, SymbolKind)> = self
            .symbols
            .iter()
            .map(|s| (s.name.as_str(), s.kind))
            .collect();
        let mut s = serializer.serialize_struct("ExprGraph", 3)?;
        s.serialize_field("nodes", &self.nodes)?;
        s.serialize_field("symbols", &symbols)?;
        s.serialize_field("functions", &self.functions)?;
        s.end()
    }
}

impl<'de> Deserialize<'de> for ExprGraph {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        struct GraphData {
            nodes: Vec<Node>,
            symbols: Vec<(String, SymbolKind)>,
            #[serde(default)]
            functions: Vec<String>,
        }

        let data = GraphData::deserialize(deserializer)?;
        rebuild(data.nodes, data.symbols, data.functions).map_err(serde::de::Error::custom)
    }
}

/// Re-intern serialized nodes, recomputing metadata and checking that the
/// arena is topologically ordered and duplicate-free.
fn rebuild(
    nodes: Vec<Node>,
    symbols: Vec<(String, SymbolKind)>,
    functions: Vec<String>,
) -> Result<ExprGraph, String> {
    let mut graph = ExprGraph {
        nodes: Vec::with_capacity(nodes.len()),
        meta: Vec::with_capacity(nodes.len()),
        interned: FxHashMap::default(),
        symbols: Vec::with_capacity(symbols.len()),
        symbol_names: FxHashMap::default(),
        functions: Vec::new(),
        function_names: FxHashMap::default(),
    };

    for name in functions {
        let id = FunctionId(graph.functions.len() as u32);
        graph.function_names.insert(name.clone(), id);
        graph.functions.push(name);
    }

    let mut symbol_exprs: Vec<Option<ExprId>> = vec![None; symbols.len()];
    for (i, node) in nodes.into_iter().enumerate() {
        if node.children().iter().any(|c| c.index() >= i) {
            return Err(format!("node {} references a later node", i));
        }
        match &node {
            Node::Symbol(s) => {
                let slot = symbol_exprs
                    .get_mut(s.index())
                    .ok_or_else(|| format!("node {} names unknown symbol {}", i, s.0))?;
                *slot = Some(ExprId(i as u32));
            }
            Node::Add(operands) | Node::Mul(operands) => {
                if operands.len() < 2 {
                    return Err(format!("node {} has {} operands", i, operands.len()));
                }
            }
            Node::Derivative(_, vars) => {
                if vars.is_empty() {
                    return Err(format!("node {} differentiates by no symbol", i));
                }
                if vars.iter().any(|v| v.index() >= symbols.len()) {
                    return Err(format!("node {} names an unknown symbol", i));
                }
            }
            Node::Apply {
                func,
                partials,
                args,
            } => {
                if func.0 as usize >= graph.functions.len() {
                    return Err(format!("node {} names unknown function {}", i, func.0));
                }
                if partials.iter().any(|&p| p as usize >= args.len()) {
                    return Err(format!("node {} differentiates a missing argument", i));
                }
            }
            _ => {}
        }
        if graph.interned.contains_key(&node) {
            return Err(format!("node {} is a duplicate", i));
        }
        let meta = graph.compute_meta(&node);
        graph.nodes.push(node.clone());
        graph.meta.push(meta);
        graph.interned.insert(node, ExprId(i as u32));
    }

    let seeded = graph.nodes.len() >= 3
        && graph.nodes[0] == Node::Const(BigRational::zero())
        && graph.nodes[1] == Node::Const(BigRational::one())
        && graph.nodes[2] == Node::Const(-BigRational::one());
    if !seeded {
        return Err("graph does not start with the constants 0, 1, -1".to_string());
    }

    for (i, (name, kind)) in symbols.into_iter().enumerate() {
        let expr = symbol_exprs[i].ok_or_else(|| format!("symbol {} has no node", i))?;
        if kind == SymbolKind::User {
            graph.symbol_names.insert(name.clone(), SymbolId(i as u32));
        }
        graph.symbols.push(SymbolInfo { name, kind, expr });
    }

    Ok(graph)
}
