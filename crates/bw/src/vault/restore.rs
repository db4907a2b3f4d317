use super::{RestoreObject, refetch_cipher};
use crate::{
    dispatch::existing_id,
    response::{CommandError, CommandResult},
    services::Services,
};

pub(crate) async fn run(services: &Services, object: RestoreObject, id: &str) -> CommandResult {
    match object {
        RestoreObject::Item => {
            let id = existing_id(id)?;
            let cipher = services
                .ciphers
                .get(id)
                .await?
                .ok_or(CommandError::NotFound)?;
            if !cipher.is_deleted() {
                return Err(CommandError::bad_request("Cipher is not in trash."));
            }

            services.ciphers.restore(id).await?;
            refetch_cipher(services, id).await
        }
    }
}
