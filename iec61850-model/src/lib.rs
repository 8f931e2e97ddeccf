//! IEC 61850 object model
//!
//! The model is an arena owned tree: nodes refer to their parent and children
//! through [`NodeId`] handles, never through owning pointers.
//!
//! # Value mirroring
//!
//! Leaves of the live tree hold a [`CommittedValue`]. Services that change
//! values first take a detached [`NodeCopy`] of the target subtree whose leaves
//! are [`ProposedValue`]s pointing back at their live leaf. The copy is decoded
//! and validated, and only then committed onto the live leaves.
//!
//! # Modules
//!
//! - `bda`: basic attribute types and value validation
//! - `node`: tree node kinds
//! - `tree`: the arena, construction API and value access
//! - `copy`: detached copies used for validation and reports
//! - `data_set`: data sets
//! - `rcb`: report control block descriptors
//! - `server_model`: the registry tying everything together
//! - `definition`: conversion between subtrees and MMS type descriptions

pub mod bda;
pub mod copy;
pub mod data_set;
pub mod definition;
pub mod node;
pub mod rcb;
pub mod server_model;
pub mod tree;

pub use bda::{BdaType, TriggerFlags};
pub use copy::{CopyContent, LeafUpdate, NodeCopy, ProposedValue};
pub use data_set::DataSet;
pub use definition::{
    fc_type_description, ln_from_type_description, ln_type_description, node_from_type_description,
    node_type_description,
};
pub use node::{BasicDataAttribute, CommittedValue, ModelNode, NodeId, NodeKind};
pub use rcb::{Rcb, RcbKind, RcbSettings};
pub use server_model::{AssociationId, ServerModel};
pub use tree::ModelTree;
