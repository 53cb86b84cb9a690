pub mod entities;
pub mod events;
pub mod value_objects;
pub mod work;

pub use entities::{
    FetchedMedia, Product, ProductId, ProductImage, ProductImageUploadData, RemoteMedia,
};
pub use events::{Event, MediaUploadEvent, ProductUpdateEvent};
pub use value_objects::{MediaErrorType, MediaUploadError, UploadStatus};
pub use work::Work;
