pub mod catalog_repo;
pub mod midtrans;
pub mod models;
pub mod order_repo;
pub mod realtime;

#[cfg(test)]
pub(crate) mod test_db;
