// Booklet generation: range expansion → retrieval → planning → assembly → rendering.
// Retrieval goes through the `TextSource` seam and rendering through `Renderer`.

pub mod generator;
pub mod handlers;
