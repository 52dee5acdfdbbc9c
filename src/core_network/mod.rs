pub mod handlers;
pub mod network;
pub mod pasv;

#[cfg(test)]
mod test_session;
