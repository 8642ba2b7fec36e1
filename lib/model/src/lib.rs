mod catalog;
mod datatype;
mod error;
mod schema;
mod star;
mod transform;

pub use catalog::*;
pub use datatype::*;
pub use error::*;
pub use schema::*;
pub use star::*;
pub use transform::*;

// Re-export some oxrdf types.
pub use oxiri::Iri;
pub use oxrdf::{
    BlankNode, BlankNodeRef, IriParseError, Literal, LiteralRef, NamedNode, NamedNodeRef,
    Term, TermRef, Variable, VariableNameParseError, VariableRef,
};

// Re-export the spargebra pattern types the planner is built on.
pub use spargebra::term::{NamedNodePattern, TermPattern, TriplePattern};
