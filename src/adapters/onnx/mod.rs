pub mod model_catalog;
pub mod pipeline;
pub mod yolo_engine;
