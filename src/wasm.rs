//! WASM bindings for the circuit leveler.
//!
//! Lets a web page balance a circuit written in the DSL and show the
//! resulting graph (for example with a Graphviz WASM build).
//!
//! ## Usage (JavaScript)
//!
//! ```javascript
//! import init, { WasmLeveler } from 'circuit_leveler';
//!
//! await init();
//!
//! const leveler = new WasmLeveler(`
//!   x = input @3
//!   m = mul x x
//!   o = output m @1
//! `);
//! const summary = leveler.balance();
//! const dot = leveler.to_dot();
//! ```

use wasm_bindgen::prelude::*;

use crate::balance::{BalancerConfig, LevelBalancer};
use crate::builder;
use crate::circuit::{validate_levels, CircuitGraph, NodeKind};
use crate::dsl;
use crate::error::LevelerError;

fn to_js(e: LevelerError) -> JsValue {
    JsValue::from_str(&e.to_string())
}

/// Initialize panic hook for better error messages in browser console.
#[wasm_bindgen(start)]
pub fn init_panic_hook() {
    console_error_panic_hook::set_once();
}

/// A circuit loaded from the DSL, balanced on demand.
#[wasm_bindgen]
pub struct WasmLeveler {
    graph: CircuitGraph,
    config: BalancerConfig,
}

#[wasm_bindgen]
impl WasmLeveler {
    /// Parse and build a circuit from a DSL string.
    ///
    /// # Example
    /// ```javascript
    /// const leveler = new WasmLeveler(circuitDsl);
    /// ```
    #[wasm_bindgen(constructor)]
    pub fn new(circuit_dsl: &str) -> Result<WasmLeveler, JsValue> {
        Self::with_options(circuit_dsl, true, true)
    }

    /// Like the constructor, with the balancer options spelled out.
    ///
    /// # Arguments
    /// * `propagate_inputs` - Propagate input levels forward first (default: true)
    /// * `collapse_noop` - Remove reductions that do not lower the level (default: true)
    #[wasm_bindgen]
    pub fn with_options(
        circuit_dsl: &str,
        propagate_inputs: bool,
        collapse_noop: bool,
    ) -> Result<WasmLeveler, JsValue> {
        let ast = dsl::parse(circuit_dsl).map_err(to_js)?;
        let graph = builder::build_circuit(&ast).map_err(to_js)?.graph;
        let config = BalancerConfig::new()
            .with_propagate_inputs(propagate_inputs)
            .with_collapse_noop_reductions(collapse_noop);
        Ok(WasmLeveler { graph, config })
    }

    /// Balance the circuit, returning a one-line summary.
    #[wasm_bindgen]
    pub fn balance(&mut self) -> Result<String, JsValue> {
        let report = LevelBalancer::with_config(self.config.clone())
            .balance(&mut self.graph)
            .map_err(to_js)?;
        validate_levels(&self.graph).map_err(to_js)?;
        Ok(report.to_string())
    }

    /// Render the circuit as a DOT graph.
    #[wasm_bindgen]
    pub fn to_dot(&self) -> String {
        crate::render::to_dot(&self.graph)
    }

    /// Number of nodes in the circuit.
    #[wasm_bindgen(getter)]
    pub fn node_count(&self) -> usize {
        self.graph.len()
    }

    /// Number of reductions currently in the circuit.
    #[wasm_bindgen(getter)]
    pub fn reduction_count(&self) -> usize {
        self.graph.count_kind(NodeKind::LevelReduce)
    }

    /// Level a node produces, or `undefined` if it is unassigned or missing.
    #[wasm_bindgen]
    pub fn node_level(&self, node_name: &str) -> Option<u32> {
        self.graph.node(node_name)?.output_depth.map(|d| d.0)
    }
}

/// Get the library version.
#[wasm_bindgen]
pub fn version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}
