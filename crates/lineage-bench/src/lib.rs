use lineage_api::{BackendGraphPayload, RawEdge, RawId, RawNode};

/// A layered warehouse: `layers` ranks of `width` tables, each feeding two
/// tables of the next rank, plus one column per table hanging off it.
pub fn synthetic_payload(layers: usize, width: usize) -> BackendGraphPayload {
    let mut nodes = Vec::with_capacity(layers * width * 2);
    let mut edges = Vec::new();
    let table_id = |layer: usize, slot: usize| (layer * width + slot) as i64;
    let column_id = |layer: usize, slot: usize| (layers * width + layer * width + slot) as i64;

    for layer in 0..layers {
        for slot in 0..width {
            let id = table_id(layer, slot);
            nodes.push(RawNode::new(RawId::Int(id), &format!("table_{layer}_{slot}"), "table"));
            nodes.push(RawNode::new(
                RawId::Int(column_id(layer, slot)),
                &format!("table_{layer}_{slot}.id"),
                "column",
            ));
            edges.push(RawEdge::new(
                RawId::Int(id),
                RawId::Int(column_id(layer, slot)),
                Some("contains"),
            ));
            if layer + 1 < layers {
                for offset in 0..2 {
                    let target = table_id(layer + 1, (slot + offset) % width);
                    edges.push(RawEdge::new(RawId::Int(id), RawId::Int(target), Some("etl")));
                }
            }
        }
    }

    // A few dangling references, as real catalogs have.
    for i in 0..width {
        edges.push(RawEdge::new(
            RawId::Int(table_id(0, i)),
            RawId::Text(format!("missing_{i}")),
            Some("etl"),
        ));
    }

    BackendGraphPayload { nodes, edges }
}
