pub mod handlers;
pub mod invitations;
pub mod state;
pub mod views;

#[cfg(test)]
pub(crate) mod fakes;

// Re-export the handlers the binary wires into the router.
pub use handlers::{
    enter_group_submit_handler, enter_group_view_handler, enter_submit_handler,
    enter_view_handler, index_handler, list_handler, manage_submit_handler, manage_view_handler,
    page_submit_handler, page_view_handler, ApiDoc,
};
