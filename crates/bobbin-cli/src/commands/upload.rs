use bobbin_client::UploadOptions;

use crate::cli::{OutputFormat, UploadArgs};
use crate::client::{AppContext, CliResult};
use crate::output::render_receipt;

pub(crate) async fn handle_upload(
    ctx: &AppContext,
    args: UploadArgs,
    format: OutputFormat,
) -> CliResult<()> {
    let options = UploadOptions {
        form_data: args.form_data(),
        url: args.url,
        field_name: args.field_name,
        show_loading: !args.quiet,
        need_token: !args.anonymous,
    };
    let receipt = ctx.facade.upload_image(&args.file, &options).await?;
    render_receipt(&receipt, format)
}
