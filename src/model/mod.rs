pub mod artifact;
pub mod invoker;
pub mod layers;
pub mod linear;
pub mod network;
pub mod provider;
