pub mod millipede;

pub mod character;
