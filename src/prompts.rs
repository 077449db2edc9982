// Instructions sent to the language model alongside the contract

use crate::spreadsheet::ColumnScheme;

/// Render the extraction instructions for `columns`, appending the user's prompt when given.
pub fn build_instructions(columns: ColumnScheme, user_prompt: Option<&str>) -> String {
    let (label, value) = columns.headers();

    let mut instructions = format!(
        "\
Please read the uploaded document and extract ALL relevant business contract information.

Return the result as a Markdown table with:
- Column 1: {label}
- Column 2: {value}

Rules:
1. Each field must be on its own row
2. Do not combine multiple values in one cell
3. If a field has multiple values, create a separate row for each value
4. Keep field names clear and descriptive
5. Format dates as MM/DD/YYYY
6. Include currency symbols for monetary values

Example format:
| {label} | {value} |
|------------|-------------|
| Customer Name | Acme Corp |
| Contract Start Date | 01/01/2024 |
| Service Description | Cloud Hosting |
| Payment Terms | Net 30 |
| Billing Rate | $100/hour |

Only return the Markdown table. Do not summarize or explain anything."
    );

    if let Some(extra) = user_prompt.map(str::trim).filter(|p| !p.is_empty()) {
        instructions.push_str("\n\nAdditional instructions from the user:\n");
        instructions.push_str(extra);
    }

    instructions
}
