pub mod arxiv;
pub mod groq;

pub use arxiv::ArxivSearch;
pub use groq::GroqChat;
