//! Context menu model returned by contributors.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures::future::BoxFuture;
use futures::FutureExt;

/// Deferred action attached to a menu item; the renderer awaits it on click.
#[derive(Clone)]
pub struct MenuCommand(Arc<dyn Fn() -> BoxFuture<'static, ()> + Send + Sync>);

impl MenuCommand {
    pub fn new<F, Fut>(action: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        Self(Arc::new(move || action().boxed()))
    }

    pub fn invoke(&self) -> BoxFuture<'static, ()> {
        (self.0)()
    }
}

impl fmt::Debug for MenuCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("MenuCommand")
    }
}

#[derive(Debug, Clone, Default)]
pub struct MenuItem {
    pub label: String,
    pub icon: Option<String>,
    pub disabled: bool,
    pub separator: bool,
    pub items: Vec<MenuItem>,
    pub command: Option<MenuCommand>,
}

impl MenuItem {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            ..Self::default()
        }
    }

    pub fn separator() -> Self {
        Self {
            separator: true,
            ..Self::default()
        }
    }

    pub fn with_icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = Some(icon.into());
        self
    }

    pub fn with_command(mut self, command: MenuCommand) -> Self {
        self.command = Some(command);
        self
    }

    pub fn with_items(mut self, items: Vec<MenuItem>) -> Self {
        self.items = items;
        self
    }

    pub fn disabled(mut self) -> Self {
        self.disabled = true;
        self
    }

    /// Runs the attached command. Disabled items and items without a command
    /// do nothing and report false.
    pub async fn activate(&self) -> bool {
        match (&self.command, self.disabled) {
            (Some(command), false) => {
                command.invoke().await;
                true
            }
            _ => false,
        }
    }
}
