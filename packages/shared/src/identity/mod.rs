use async_trait::async_trait;
use aws_sdk_cognitoidentityprovider::types::AttributeType;
use aws_sdk_cognitoidentityprovider::Client;

#[cfg(test)]
use mockall::automock;

/// The slice of an identity-provider user record this system reads or
/// writes. Only login state and public display attributes; credentials stay
/// with the provider.
#[derive(Debug, Clone)]
pub struct IdentityUser {
    pub user_id: String,
    pub display_name: Option<String>,
    pub photo_url: Option<String>,
    pub enabled: bool,
    pub moderator: bool,
}

#[derive(Debug)]
pub enum IdentityError {
    NotFound,
    Provider(String),
}

impl std::fmt::Display for IdentityError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IdentityError::NotFound => write!(f, "Identity record not found"),
            IdentityError::Provider(msg) => write!(f, "Identity provider error: {}", msg),
        }
    }
}

impl std::error::Error for IdentityError {}

#[async_trait]
#[cfg_attr(test, automock)]
pub trait IdentityProvider: Send + Sync {
    async fn get_user(&self, user_id: &str) -> Result<IdentityUser, IdentityError>;
    /// Clears display name and photo, then disables login.
    async fn disable_and_strip(&self, user_id: &str) -> Result<(), IdentityError>;
    /// Restores the display name and re-enables login.
    async fn restore_and_enable(
        &self,
        user_id: &str,
        display_name: &str,
    ) -> Result<(), IdentityError>;
}

pub struct CognitoIdentityProvider {
    pub client: Client,
    pub user_pool_id: String,
}

impl CognitoIdentityProvider {
    pub fn new(client: Client) -> Self {
        let user_pool_id =
            std::env::var("USER_POOL_ID").expect("USER_POOL_ID environment variable must be set");
        Self {
            client,
            user_pool_id,
        }
    }

    pub fn with_user_pool_id(client: Client, user_pool_id: &str) -> Self {
        Self {
            client,
            user_pool_id: user_pool_id.to_string(),
        }
    }
}

#[async_trait]
impl IdentityProvider for CognitoIdentityProvider {
    async fn get_user(&self, user_id: &str) -> Result<IdentityUser, IdentityError> {
        let output = self
            .client
            .admin_get_user()
            .user_pool_id(&self.user_pool_id)
            .username(user_id)
            .send()
            .await
            .map_err(|e| {
                let message = e.to_string();
                if message.contains("UserNotFoundException") {
                    IdentityError::NotFound
                } else {
                    IdentityError::Provider(message)
                }
            })?;

        let mut display_name = None;
        let mut photo_url = None;
        let mut moderator = false;
        for attribute in output.user_attributes() {
            match attribute.name() {
                "name" => display_name = attribute.value().map(str::to_string),
                "picture" => photo_url = attribute.value().map(str::to_string),
                "custom:moderator" => moderator = attribute.value() == Some("true"),
                _ => {}
            }
        }

        Ok(IdentityUser {
            user_id: user_id.to_string(),
            display_name,
            photo_url,
            enabled: output.enabled(),
            moderator,
        })
    }

    async fn disable_and_strip(&self, user_id: &str) -> Result<(), IdentityError> {
        self.client
            .admin_delete_user_attributes()
            .user_pool_id(&self.user_pool_id)
            .username(user_id)
            .user_attribute_names("name")
            .user_attribute_names("picture")
            .send()
            .await
            .map_err(|e| IdentityError::Provider(e.to_string()))?;
        self.client
            .admin_disable_user()
            .user_pool_id(&self.user_pool_id)
            .username(user_id)
            .send()
            .await
            .map_err(|e| IdentityError::Provider(e.to_string()))?;
        Ok(())
    }

    async fn restore_and_enable(
        &self,
        user_id: &str,
        display_name: &str,
    ) -> Result<(), IdentityError> {
        self.client
            .admin_update_user_attributes()
            .user_pool_id(&self.user_pool_id)
            .username(user_id)
            .user_attributes(
                AttributeType::builder()
                    .name("name")
                    .value(display_name)
                    .build()
                    .map_err(|e| IdentityError::Provider(e.to_string()))?,
            )
            .send()
            .await
            .map_err(|e| IdentityError::Provider(e.to_string()))?;
        self.client
            .admin_enable_user()
            .user_pool_id(&self.user_pool_id)
            .username(user_id)
            .send()
            .await
            .map_err(|e| IdentityError::Provider(e.to_string()))?;
        Ok(())
    }
}
