pub mod common;
pub mod pdb;

pub use common::{
    API_VERSION, CLUSTER_NAME_LABEL_KEY, FIELD_MANAGER, KIND, cluster_annotations,
    cluster_labels, owner_reference,
};
