use std::sync::Arc;

use tokio::sync::watch;

use storefront_lists::ListId;

use crate::api::StorefrontApi;
use crate::types::{CustomList, CustomListDetail};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CustomListsState {
    pub lists: Vec<CustomList>,
    pub selected: Option<CustomListDetail>,
    pub loading: bool,
    pub error: Option<String>,
}

pub struct CustomListsView {
    api: Arc<dyn StorefrontApi>,
    state: watch::Sender<CustomListsState>,
}

impl CustomListsView {
    pub fn new(api: Arc<dyn StorefrontApi>) -> Self {
        let (state, _) = watch::channel(CustomListsState::default());
        Self { api, state }
    }

    pub fn subscribe(&self) -> watch::Receiver<CustomListsState> {
        self.state.subscribe()
    }

    pub fn snapshot(&self) -> CustomListsState {
        self.state.borrow().clone()
    }

    pub async fn load(&self) {
        self.state.send_modify(|s| {
            s.loading = true;
            s.error = None;
        });
        let result = self.api.list_custom_lists().await;
        self.state.send_modify(|s| {
            s.loading = false;
            match result {
                Ok(lists) => s.lists = lists,
                Err(e) => s.error = Some(e.to_string()),
            }
        });
    }

    /// Open one list with its products resolved.
    pub async fn open(&self, id: ListId) {
        self.state.send_modify(|s| {
            s.loading = true;
            s.error = None;
        });
        let result = self.api.get_custom_list(id).await;
        self.state.send_modify(|s| {
            s.loading = false;
            match result {
                Ok(detail) => s.selected = Some(detail),
                Err(e) => {
                    s.selected = None;
                    s.error = Some(e.to_string());
                }
            }
        });
    }

    pub fn close(&self) {
        self.state.send_modify(|s| s.selected = None);
    }
}
